//! The lazy, memoizing evaluator.
//!
//! The resolver owns a working state (plan, values, visited and completed
//! sets, trace) that lives for one resolution. The outer pass walks every
//! planned target and evaluates its node; `id` references re-enter the
//! evaluator on demand, memoized by the visited set.
//!
//! Two subtleties are load-bearing:
//!
//! - The `id` path re-enters on `completed`, not `visited`. A target can
//!   therefore reference itself mid-evaluation (`a = a + 1` reads the value
//!   written by an earlier operation at `a`). A true cycle across distinct
//!   targets makes the recursive re-entry a no-op and the subsequent read
//!   finds no value, so cycles surface as the "processed with no value"
//!   error rather than a dedicated cycle error.
//! - Adding a kit grafts bonus operations mid-flight: applied inline if the
//!   target was already visited, queued onto the plan otherwise.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use tracing::{debug, warn};

use herosheet_model::{Character, Sheet};

use crate::library::Reference;
use crate::plan::{build_plan, Plan};
use crate::sheet;
use crate::trace::Trace;
use crate::types::{
    Assertion, Decision, Expression, OpKind, Operation, RefKind, ResolveError, Value, ValueRef,
    ABILITIES_TARGET, ABILITY_MODIFIERS_TARGET, DOMAINS_TARGET, FEATURES_TARGET, KITS_TARGET,
    SKILLS_TARGET,
};

/// Kit scalar bonuses and the dotted targets they graft onto.
const KIT_GRAFT_TARGETS: [(&str, &str); 4] = [
    ("stamina", "health.max_stamina"),
    ("speed", "movement.speed"),
    ("stability", "movement.stability"),
    ("disengage", "movement.disengage"),
];

/// Derives a character sheet from a character, the player's decisions, and
/// the reference library. One resolver performs one resolution.
pub struct Resolver<'a> {
    character: &'a Character,
    decisions: &'a BTreeMap<String, Decision>,
    reference: &'a Reference,

    plan: Plan,
    values: BTreeMap<String, Value>,
    visited: BTreeSet<String>,
    completed: BTreeSet<String>,
    trace: Trace,
}

impl<'a> Resolver<'a> {
    pub fn new(
        character: &'a Character,
        decisions: &'a BTreeMap<String, Decision>,
        reference: &'a Reference,
    ) -> Self {
        Resolver {
            character,
            decisions,
            reference,
            plan: Plan::new(),
            values: BTreeMap::new(),
            visited: BTreeSet::new(),
            completed: BTreeSet::new(),
            trace: Trace::new(),
        }
    }

    /// Run the full resolution and assemble the typed sheet.
    pub fn resolve(mut self) -> Result<Sheet, ResolveError> {
        let values = self.resolve_values()?;
        sheet::assemble(values)
    }

    /// Run the resolution and return the flat target-to-value map, without
    /// shaping it into a sheet.
    pub fn resolve_values(&mut self) -> Result<BTreeMap<String, Value>, ResolveError> {
        let reference = self.reference;
        let class = reference
            .class(&self.character.class_id)
            .ok_or_else(|| ResolveError::ClassNotFound {
                class_id: self.character.class_id.clone(),
            })?;

        self.plan = build_plan(class, self.character.level, self.decisions, reference)?;
        self.seed_identity();

        if let Err(error) = self.run() {
            return Err(self.traced(error));
        }

        Ok(mem::take(&mut self.values))
    }

    /// Seed the character's identity into the environment so class data
    /// and choice preconditions can reference it. Seeded targets count as
    /// completed: they have a value and nothing further to evaluate.
    fn seed_identity(&mut self) {
        let seeds = [
            ("character_id", Value::Str(self.character.id.clone())),
            ("class_id", Value::Str(self.character.class_id.clone())),
            ("level", Value::Int(self.character.level)),
        ];
        for (target, value) in seeds {
            self.values.insert(target.to_string(), value);
            self.visited.insert(target.to_string());
            self.completed.insert(target.to_string());
        }
    }

    /// The outer pass. Kit grafting can queue operations onto targets that
    /// had none when the pass started, so keep sweeping until every
    /// planned target has been visited.
    fn run(&mut self) -> Result<(), ResolveError> {
        loop {
            let pending: Vec<String> = self
                .plan
                .targets()
                .filter(|target| !self.visited.contains(*target))
                .cloned()
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            for target in pending {
                self.trace.push(format!("node:{}", target));
                self.evaluate_node(&target)?;
                self.trace.pop();
            }
        }
    }

    /// Evaluate every queued operation at a target, once.
    fn evaluate_node(&mut self, target: &str) -> Result<(), ResolveError> {
        if self.visited.contains(target) {
            return Ok(());
        }
        self.visited.insert(target.to_string());

        // Snapshot the queue: operations grafted onto this target from here
        // on are executed inline instead (the target is now visited).
        let operations = self
            .plan
            .operations(target)
            .map(<[Operation]>::to_vec)
            .ok_or_else(|| ResolveError::UnknownNode {
                target: target.to_string(),
            })?;

        for operation in &operations {
            self.trace.push(format!("op:{}", operation));
            self.evaluate_operation(operation)?;
            self.trace.pop();
        }

        self.completed.insert(target.to_string());
        Ok(())
    }

    /// Apply one operation: check its gates, evaluate its value, write the
    /// effect. A failed gate skips this operation only.
    fn evaluate_operation(&mut self, operation: &Operation) -> Result<(), ResolveError> {
        for assertion in &operation.prereqs {
            if !self.check_assertion(assertion) {
                debug!(operation = %operation, "precondition failed, skipping operation");
                return Ok(());
            }
        }

        self.trace.push(format!("value:{}", operation.value_ref));
        let result = self.evaluate_value_ref(&operation.value_ref)?;
        self.trace.pop();

        // Add operations write to the canonical collection for their kind,
        // whatever the operation's own target says.
        match operation.kind {
            OpKind::Set => {
                self.values.insert(operation.target.clone(), result);
            }
            OpKind::AddSkill => self.append_unique(SKILLS_TARGET, result.into_str()?)?,
            OpKind::AddAbility => self.append_unique(ABILITIES_TARGET, result.into_str()?)?,
            OpKind::ModifyAbility => {
                self.append_unique(ABILITY_MODIFIERS_TARGET, result.into_str()?)?
            }
            OpKind::AddDomain => self.append_unique(DOMAINS_TARGET, result.into_str()?)?,
            OpKind::AddFeature => self.append_unique(FEATURES_TARGET, result.into_str()?)?,
            OpKind::AddKit => {
                let kit_id = result.into_str()?;
                self.append_unique(KITS_TARGET, kit_id.clone())?;
                self.graft_kit(&kit_id)?;
            }
        }
        Ok(())
    }

    /// Append an identifier to a collection target, initializing the
    /// collection on first use and skipping identifiers already present.
    fn append_unique(&mut self, target: &str, id: String) -> Result<(), ResolveError> {
        let entry = self
            .values
            .entry(target.to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        match entry {
            Value::List(items) => {
                if !items.contains(&id) {
                    items.push(id);
                }
                Ok(())
            }
            other => Err(ResolveError::TypeMismatch {
                expected: "list",
                got: other.type_name(),
            }),
        }
    }

    /// Graft a kit's bonuses into the evaluation.
    ///
    /// Each nonzero scalar bonus becomes a `set` of `<target> + <bonus>`.
    /// If the target is already being (or has been) evaluated the synthetic
    /// operation runs now; otherwise it is queued so the pending node picks
    /// it up. The kit's abilities are added directly.
    fn graft_kit(&mut self, kit_id: &str) -> Result<(), ResolveError> {
        let reference = self.reference;
        let kit = reference
            .kit(kit_id)
            .ok_or_else(|| ResolveError::RefNotFound {
                kind: RefKind::Kit,
                id: kit_id.to_string(),
            })?;

        let bonuses = [
            kit.bonuses.stamina_bonus,
            kit.bonuses.speed_bonus,
            kit.bonuses.stability_bonus,
            kit.bonuses.disengage_bonus,
        ];
        for ((name, target), bonus) in KIT_GRAFT_TARGETS.into_iter().zip(bonuses) {
            if bonus == 0 {
                continue;
            }
            let operation = Operation {
                kind: OpKind::Set,
                target: target.to_string(),
                value_ref: ValueRef::Expr(Box::new(Expression::Add(vec![
                    ValueRef::Id(target.to_string()),
                    ValueRef::Int(bonus),
                ]))),
                prereqs: Vec::new(),
            };
            if self.visited.contains(target) {
                debug!(kit = kit_id, bonus = name, node = target, "applying kit bonus inline");
                self.trace.push(format!("op:{}", operation));
                self.evaluate_operation(&operation)?;
                self.trace.pop();
            } else {
                debug!(kit = kit_id, bonus = name, node = target, "queueing kit bonus");
                self.plan.push(operation);
            }
        }

        // Kit abilities are appended without the dedup check the add
        // operations apply. Tiered damage bonuses and the ranged distance
        // bonus are present in the data but produce no operations.
        for ability_id in &kit.abilities {
            if !reference.has_ability(ability_id) {
                return Err(ResolveError::RefNotFound {
                    kind: RefKind::Ability,
                    id: ability_id.clone(),
                });
            }
            let entry = self
                .values
                .entry(ABILITIES_TARGET.to_string())
                .or_insert_with(|| Value::List(Vec::new()));
            match entry {
                Value::List(items) => items.push(ability_id.clone()),
                other => {
                    return Err(ResolveError::TypeMismatch {
                        expected: "list",
                        got: other.type_name(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolve a symbolic value to a runtime value.
    fn evaluate_value_ref(&mut self, value_ref: &ValueRef) -> Result<Value, ResolveError> {
        match value_ref {
            ValueRef::Int(i) => Ok(Value::Int(*i)),
            ValueRef::Str(s) => Ok(Value::Str(s.clone())),
            // A library reference resolves to its identifier; existence was
            // validated when the operation was reduced.
            ValueRef::Ref { id, .. } => Ok(Value::Str(id.clone())),
            ValueRef::Expr(expression) => {
                Ok(Value::Int(self.evaluate_expression(expression)?))
            }
            ValueRef::Id(target) => {
                if self.completed.contains(target) {
                    return self.values.get(target).cloned().ok_or_else(|| {
                        ResolveError::EmptyNode {
                            target: target.clone(),
                        }
                    });
                }

                // Not completed yet: evaluate the node now. The guard is
                // the completed set, not the visited set, so a target may
                // reference itself; the re-entry below is then a no-op and
                // the read picks up whatever earlier operations wrote.
                self.trace.push(format!("node:{}", target));
                self.evaluate_node(target)?;
                self.trace.pop();

                self.values
                    .get(target)
                    .cloned()
                    .ok_or_else(|| ResolveError::EmptyNode {
                        target: target.clone(),
                    })
            }
        }
    }

    /// Evaluate an integer expression.
    fn evaluate_expression(&mut self, expression: &Expression) -> Result<i64, ResolveError> {
        match expression {
            Expression::Add(args) => {
                let mut sum = 0;
                for arg in args {
                    sum += self.evaluate_value_ref(arg)?.as_int()?;
                }
                Ok(sum)
            }
            Expression::Subtract(args) => {
                if args.len() != 2 {
                    return Err(ResolveError::SubtractArity { count: args.len() });
                }
                let a = self.evaluate_value_ref(&args[0])?.as_int()?;
                let b = self.evaluate_value_ref(&args[1])?.as_int()?;
                Ok(a - b)
            }
        }
    }

    /// Check an assertion. Assertions are gates, not predicates: a failed
    /// candidate evaluation or a missing target makes the assertion false,
    /// never fatal.
    fn check_assertion(&mut self, assertion: &Assertion) -> bool {
        match assertion {
            Assertion::Value { target, values } => {
                let Some(actual) = self.values.get(target).cloned() else {
                    debug!(node = %target, "assertion false: target has no value");
                    return false;
                };

                for candidate in values {
                    let value = match self.evaluate_value_ref(candidate) {
                        Ok(value) => value,
                        Err(error) => {
                            warn!(%error, "assertion candidate failed to evaluate");
                            continue;
                        }
                    };
                    let matched = match (&value, &actual) {
                        (Value::Int(candidate), Value::Int(actual)) => candidate == actual,
                        (Value::Str(candidate), Value::Str(actual)) => candidate == actual,
                        _ => {
                            warn!(
                                candidate = value.type_name(),
                                actual = actual.type_name(),
                                "assertion candidate has unexpected type"
                            );
                            false
                        }
                    };
                    if matched {
                        debug!(node = %target, "assertion true");
                        return true;
                    }
                }

                debug!(node = %target, "assertion false: no candidate matched");
                false
            }
            Assertion::RefArray { ref_type, values } => {
                let Some(target) = ref_type.collection_target() else {
                    warn!(kind = %ref_type, "assertion false: kind has no collection");
                    return false;
                };
                self.check_collection_contains(target, values)
            }
        }
    }

    /// Check that every candidate identifier is present in a collection,
    /// evaluating the collection's node first if it is still pending.
    fn check_collection_contains(&mut self, target: &str, candidates: &[ValueRef]) -> bool {
        let items = match self.values.get(target) {
            Some(Value::List(items)) => items.clone(),
            Some(other) => {
                warn!(node = target, got = other.type_name(), "assertion false: not a collection");
                return false;
            }
            None => {
                if !self.plan.contains(target) {
                    debug!(node = target, "assertion false: collection absent with no pending operations");
                    return false;
                }
                self.trace.push(format!("node:{}", target));
                if let Err(error) = self.evaluate_node(target) {
                    warn!(%error, node = target, "assertion false: collection failed to evaluate");
                    return false;
                }
                self.trace.pop();
                match self.values.get(target) {
                    Some(Value::List(items)) => items.clone(),
                    _ => {
                        debug!(node = target, "assertion false: collection absent after evaluation");
                        return false;
                    }
                }
            }
        };

        for candidate in candidates {
            let id = match self.evaluate_value_ref(candidate) {
                Ok(Value::Str(id)) => id,
                Ok(other) => {
                    debug!(
                        got = other.type_name(),
                        "assertion false: candidate is not an identifier"
                    );
                    return false;
                }
                Err(error) => {
                    debug!(%error, "assertion false: candidate failed to evaluate");
                    return false;
                }
            };
            if !items.contains(&id) {
                debug!(node = target, id = %id, "assertion false: identifier not in collection");
                return false;
            }
        }

        debug!(node = target, "assertion true");
        true
    }

    fn traced(&self, error: ResolveError) -> ResolveError {
        if self.trace.is_empty() {
            error
        } else {
            ResolveError::Traced {
                error: Box::new(error),
                trace: self.trace.to_string(),
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
