//! The symbolic value language and its JSON decoding.
//!
//! Class data is declarative: it describes *writes* (operations) against
//! named targets, gated by assertions, with values given as symbolic
//! references that are only resolved during evaluation. Everything here is
//! a tagged union decoded from JSON. `ValueRef` and `Expression` carry a
//! payload whose shape depends on the discriminator, so they decode in two
//! phases: the raw `type` field first, then the payload against it.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur while resolving a character sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The character's class is not in the reference library.
    ClassNotFound { class_id: String },
    /// An option-select decision named an option the choice does not offer.
    OptionNotFound { choice_id: String, option_id: String },
    /// A decision's payload does not match its choice's type.
    DecisionMismatch {
        choice_id: String,
        expected: &'static str,
    },
    /// A referenced identifier is not in the reference library.
    RefNotFound { kind: RefKind, id: String },
    /// An ability modifier id is not of the dotted `ability.modifier` form.
    InvalidModifierId { id: String },
    /// The ability half of a dotted modifier id exists, but the modifier
    /// half does not.
    ModifierNotFound {
        ability_id: String,
        modifier_id: String,
    },
    /// A reference kind that can never be added to a sheet was selected.
    UnsupportedRefKind { kind: RefKind },
    /// A referenced target has no operations and no value.
    UnknownNode { target: String },
    /// A referenced target was evaluated but produced no value. This is
    /// also how cross-target reference cycles surface.
    EmptyNode { target: String },
    /// A value had the wrong runtime type for the operation consuming it.
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A subtract expression did not have exactly two arguments.
    SubtractArity { count: usize },
    /// The flat value map could not be shaped into a sheet.
    Assembly { message: String },
    /// An evaluation error, wrapped with the diagnostic trace at the point
    /// of failure.
    Traced {
        error: Box<ResolveError>,
        trace: String,
    },
}

impl ResolveError {
    /// Unwrap any trace wrapper and return the underlying error.
    pub fn root(&self) -> &ResolveError {
        match self {
            ResolveError::Traced { error, .. } => error.root(),
            other => other,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::ClassNotFound { class_id } => {
                write!(f, "class \"{}\" not found", class_id)
            }
            ResolveError::OptionNotFound {
                choice_id,
                option_id,
            } => {
                write!(
                    f,
                    "option \"{}\" for choice \"{}\" not found",
                    option_id, choice_id
                )
            }
            ResolveError::DecisionMismatch {
                choice_id,
                expected,
            } => {
                write!(
                    f,
                    "decision for choice \"{}\" must be a {} decision",
                    choice_id, expected
                )
            }
            ResolveError::RefNotFound { kind, id } => {
                write!(f, "{} \"{}\" not found", kind, id)
            }
            ResolveError::InvalidModifierId { id } => {
                write!(f, "invalid ability modifier id: {}", id)
            }
            ResolveError::ModifierNotFound {
                ability_id,
                modifier_id,
            } => {
                write!(
                    f,
                    "modifier \"{}\" not found for ability \"{}\"",
                    modifier_id, ability_id
                )
            }
            ResolveError::UnsupportedRefKind { kind } => {
                write!(f, "reference type \"{}\" cannot be added to a sheet", kind)
            }
            ResolveError::UnknownNode { target } => {
                write!(f, "node \"{}\" does not exist", target)
            }
            ResolveError::EmptyNode { target } => {
                write!(f, "node \"{}\" was processed with no value", target)
            }
            ResolveError::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            ResolveError::SubtractArity { count } => {
                write!(f, "subtract requires exactly two arguments, got {}", count)
            }
            ResolveError::Assembly { message } => {
                write!(f, "sheet assembly failed: {}", message)
            }
            ResolveError::Traced { error, trace } => {
                write!(f, "{} [trace: {}]", error, trace)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

/// A runtime value held at a target during evaluation.
///
/// Scalar targets hold integers or strings; collection targets hold lists
/// of identifiers; the unflattening pass builds nested maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Extract an integer or return a type error.
    pub fn as_int(&self) -> Result<i64, ResolveError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(ResolveError::TypeMismatch {
                expected: "int",
                got: other.type_name(),
            }),
        }
    }

    /// Extract a string or return a type error.
    pub fn into_str(self) -> Result<String, ResolveError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(ResolveError::TypeMismatch {
                expected: "string",
                got: other.type_name(),
            }),
        }
    }

    /// Convert to JSON for sheet assembly and output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Str(s) => serde_json::Value::from(s.clone()),
            Value::List(items) => serde_json::Value::from(items.clone()),
            Value::Map(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

// ──────────────────────────────────────────────
// Reference kinds
// ──────────────────────────────────────────────

/// The kinds of entity a `RefId` can point at in the reference library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Ability,
    AbilityModifier,
    Domain,
    Feature,
    Kit,
    Skill,
    SkillGroup,
}

impl RefKind {
    /// The canonical collection target this kind is added to, or `None`
    /// for kinds that are never added to a sheet.
    pub fn collection_target(self) -> Option<&'static str> {
        match self {
            RefKind::Ability => Some(ABILITIES_TARGET),
            RefKind::AbilityModifier => Some(ABILITY_MODIFIERS_TARGET),
            RefKind::Domain => Some(DOMAINS_TARGET),
            RefKind::Feature => Some(FEATURES_TARGET),
            RefKind::Kit => Some(KITS_TARGET),
            RefKind::Skill => Some(SKILLS_TARGET),
            RefKind::SkillGroup => None,
        }
    }

    /// The canonical add-operation for this kind, or `None` for kinds that
    /// are never added to a sheet.
    pub fn add_operation(self) -> Option<OpKind> {
        match self {
            RefKind::Ability => Some(OpKind::AddAbility),
            RefKind::AbilityModifier => Some(OpKind::ModifyAbility),
            RefKind::Domain => Some(OpKind::AddDomain),
            RefKind::Feature => Some(OpKind::AddFeature),
            RefKind::Kit => Some(OpKind::AddKit),
            RefKind::Skill => Some(OpKind::AddSkill),
            RefKind::SkillGroup => None,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefKind::Ability => "ability",
            RefKind::AbilityModifier => "ability_modifier",
            RefKind::Domain => "domain",
            RefKind::Feature => "feature",
            RefKind::Kit => "kit",
            RefKind::Skill => "skill",
            RefKind::SkillGroup => "skill_group",
        };
        f.write_str(name)
    }
}

/// Canonical collection target names.
pub const ABILITIES_TARGET: &str = "abilities";
pub const ABILITY_MODIFIERS_TARGET: &str = "ability_modifiers";
pub const DOMAINS_TARGET: &str = "domains";
pub const FEATURES_TARGET: &str = "features";
pub const KITS_TARGET: &str = "kits";
pub const SKILLS_TARGET: &str = "skills";

// ──────────────────────────────────────────────
// ValueRef and Expression
// ──────────────────────────────────────────────

/// A symbolic reference to a value, resolved during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef {
    /// Integer literal.
    Int(i64),
    /// String literal.
    Str(String),
    /// Late-bound reference to the evaluated value of another target.
    Id(String),
    /// Reference into the static reference library.
    Ref { id: String, kind: RefKind },
    /// Nested arithmetic expression.
    Expr(Box<Expression>),
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Int(i) => write!(f, "int({})", i),
            ValueRef::Str(s) => write!(f, "string({})", s),
            ValueRef::Id(target) => write!(f, "id({})", target),
            ValueRef::Ref { id, kind } => write!(f, "refid({}:{})", kind, id),
            ValueRef::Expr(e) => write!(f, "expr({})", e),
        }
    }
}

/// The wire shape is `{type, value, ref_type?}` and `value`'s payload
/// depends on `type`, so decoding is two-phase: grab the raw fields, then
/// decode `value` against the discriminator.
impl<'de> Deserialize<'de> for ValueRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawValueRef {
            #[serde(rename = "type")]
            kind: String,
            value: serde_json::Value,
            #[serde(default)]
            ref_type: Option<RefKind>,
        }

        let raw = RawValueRef::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "int" => {
                let i = serde_json::from_value::<i64>(raw.value).map_err(D::Error::custom)?;
                Ok(ValueRef::Int(i))
            }
            "string" => {
                let s = serde_json::from_value::<String>(raw.value).map_err(D::Error::custom)?;
                Ok(ValueRef::Str(s))
            }
            "id" => {
                let s = serde_json::from_value::<String>(raw.value).map_err(D::Error::custom)?;
                Ok(ValueRef::Id(s))
            }
            "refid" => {
                let id = serde_json::from_value::<String>(raw.value).map_err(D::Error::custom)?;
                let kind = raw
                    .ref_type
                    .ok_or_else(|| D::Error::custom("refid value is missing \"ref_type\""))?;
                Ok(ValueRef::Ref { id, kind })
            }
            "expression" => {
                let e = serde_json::from_value::<Expression>(raw.value).map_err(D::Error::custom)?;
                Ok(ValueRef::Expr(Box::new(e)))
            }
            other => Err(D::Error::custom(format!(
                "invalid ValueRef type: {}",
                other
            ))),
        }
    }
}

/// An integer arithmetic expression over `ValueRef` arguments.
///
/// `Subtract` carries its arguments as a list; the exactly-two arity rule
/// is enforced when the expression is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Add(Vec<ValueRef>),
    Subtract(Vec<ValueRef>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Add(args) => write!(f, "add/{}", args.len()),
            Expression::Subtract(args) => write!(f, "subtract/{}", args.len()),
        }
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawExpression {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            args: Vec<ValueRef>,
        }

        let raw = RawExpression::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "add" => Ok(Expression::Add(raw.args)),
            "subtract" => Ok(Expression::Subtract(raw.args)),
            other => Err(D::Error::custom(format!(
                "unknown expression type: {}",
                other
            ))),
        }
    }
}

// ──────────────────────────────────────────────
// Operations and assertions
// ──────────────────────────────────────────────

/// The kinds of write an operation can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Set,
    AddSkill,
    AddAbility,
    ModifyAbility,
    AddDomain,
    AddFeature,
    AddKit,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Set => "set",
            OpKind::AddSkill => "add_skill",
            OpKind::AddAbility => "add_ability",
            OpKind::ModifyAbility => "modify_ability",
            OpKind::AddDomain => "add_domain",
            OpKind::AddFeature => "add_feature",
            OpKind::AddKit => "add_kit",
        };
        f.write_str(name)
    }
}

/// A single write against a target, optionally gated by assertions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub target: String,
    pub value_ref: ValueRef,
    #[serde(default)]
    pub prereqs: Vec<Assertion>,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.target)
    }
}

/// A precondition checked before an operation is applied. A failing
/// assertion skips the operation; it is never a fatal error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// The current value at `target` must equal one of the candidates.
    Value {
        target: String,
        #[serde(default)]
        values: Vec<ValueRef>,
    },
    /// Every candidate identifier must appear in the collection for
    /// `ref_type`.
    RefArray {
        ref_type: RefKind,
        #[serde(default)]
        values: Vec<ValueRef>,
    },
}

// ──────────────────────────────────────────────
// Choices and decisions
// ──────────────────────────────────────────────

/// A decision point declared by a class. The player resolves it with a
/// `Decision`; the reducer compiles the pair into operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    pub id: String,
    #[serde(default)]
    pub prereqs: Vec<Assertion>,
    #[serde(flatten)]
    pub kind: ChoiceKind,
}

/// What form a choice takes, and the data each form needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChoiceKind {
    /// Pick one of a fixed set of options, each carrying operations.
    OptionSelect {
        #[serde(default)]
        options: Vec<ChoiceOption>,
    },
    /// Pick an entity of a given kind from the reference library.
    RefSelect { ref_type: RefKind },
    /// Supply a target and value directly.
    Input,
}

/// One selectable option within an option-select choice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

/// A player's resolution of a choice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Decision {
    /// Resolves an option-select choice.
    #[serde(rename = "id")]
    Option { choice_id: String, option_id: String },
    /// Resolves a ref-select choice.
    #[serde(rename = "refid")]
    Ref { choice_id: String, ref_id: String },
    /// Resolves an input choice.
    #[serde(rename = "value")]
    Input {
        choice_id: String,
        target: String,
        value: ValueRef,
    },
}

impl Decision {
    /// The id of the choice this decision resolves.
    pub fn choice_id(&self) -> &str {
        match self {
            Decision::Option { choice_id, .. }
            | Decision::Ref { choice_id, .. }
            | Decision::Input { choice_id, .. } => choice_id,
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
