//! Character input and computed sheet output types.
//!
//! These are the boundary types of the resolver: a `Character` describes
//! what the player picked at the coarsest level (class and level), and a
//! `Sheet` is the fully-computed result. Both are plain serde records; the
//! rules engine that derives one from the other lives in `herosheet-rules`.

use serde::{Deserialize, Serialize};

/// A character descriptor, as stored or submitted by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub level: i64,
}

/// A fully-computed character sheet.
///
/// Scalar fields are required: class data is expected to produce a value
/// for every one of them, and sheet assembly fails if any is missing.
/// Collection fields and the freeform `class` subtree default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub character_id: String,
    pub class_id: String,
    pub level: i64,
    pub heroic_resource: String,
    pub characteristics: Characteristics,
    pub health: Health,
    pub movement: Movement,
    pub potencies: Potencies,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub ability_modifiers: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub kits: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Class-specific values, nested under dotted `class.*` targets.
    #[serde(default)]
    pub class: serde_json::Map<String, serde_json::Value>,
}

/// The five core characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub might: i64,
    pub agility: i64,
    pub reason: i64,
    pub intuition: i64,
    pub presence: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub max_stamina: i64,
    pub max_recoveries: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub size: Size,
    pub speed: i64,
    pub stability: i64,
    pub disengage: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub space: i64,
    #[serde(rename = "type")]
    pub kind: SizeKind,
}

/// Creature size categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeKind {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for SizeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SizeKind::Small => "small",
            SizeKind::Medium => "medium",
            SizeKind::Large => "large",
        };
        f.write_str(name)
    }
}

/// Potency thresholds used by power rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Potencies {
    pub strong: i64,
    pub average: i64,
    pub weak: i64,
}
