//! The reference library: the static game content catalog.
//!
//! Every entity kind is indexed by identifier. The resolver only ever
//! performs lookups against the library; it never enumerates it. How the
//! library is populated (JSON files on disk, embedded data) is the
//! caller's concern.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{Choice, Operation, ValueRef};

// ──────────────────────────────────────────────
// Classes
// ──────────────────────────────────────────────

/// A character class: base operations and choices, plus per-level blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub basics: ClassLevel,
    /// Keyed by level number. Ordered so the planner walks levels in
    /// ascending order.
    #[serde(default)]
    pub levels: BTreeMap<u32, ClassLevel>,
}

/// The operations and choices granted by one level (or by `basics`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ClassLevel {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

// ──────────────────────────────────────────────
// Skills and domains
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Skill {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SkillGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description_short: String,
    #[serde(default, rename = "skills")]
    pub skill_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Domain {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ──────────────────────────────────────────────
// Features
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Empty for a basic feature, `"perk"` for a perk.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text_sections: Vec<String>,
    #[serde(default)]
    pub abilities: Vec<String>,
}

// ──────────────────────────────────────────────
// Abilities
// ──────────────────────────────────────────────

/// An ability, with its display sections and optional modifiers.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Ability {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `"basic"`, `"heroic"`, or `"signature"`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub heroic_resource_cost: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub range: AbilityRange,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub sections: Vec<AbilitySection>,
    #[serde(default)]
    pub modifiers: BTreeMap<String, AbilityModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AbilityRange {
    /// `"distance"` or `"area"`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub within: i64,
}

/// One display section of an ability: text, bulleted text, or a power roll.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AbilitySection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub roll: PowerRoll,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PowerRoll {
    #[serde(default)]
    pub modifiers: Vec<RollModifier>,
    #[serde(default)]
    pub results: RollResults,
}

/// A modifier applied to a power roll: a single value, or alternatives.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RollModifier {
    /// `"single"` or `"or"`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<ValueRef>,
    #[serde(default)]
    pub values: Vec<ValueRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RollResults {
    #[serde(default)]
    pub tier_i: RollResult,
    #[serde(default)]
    pub tier_ii: RollResult,
    #[serde(default)]
    pub tier_iii: RollResult,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RollResult {
    #[serde(default)]
    pub damage_base: i64,
    #[serde(default)]
    pub damage_modifiers: Vec<RollModifier>,
    #[serde(default)]
    pub damage_type: String,
    #[serde(default)]
    pub potency_effect: PotencyEffect,
    #[serde(default)]
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PotencyEffect {
    #[serde(default)]
    pub characteristic_letter: String,
    #[serde(default)]
    pub potency_id: String,
    #[serde(default)]
    pub effect: String,
}

/// A named variant of an ability, selectable via `modify_ability`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AbilityModifier {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sections: Vec<AbilitySection>,
}

// ──────────────────────────────────────────────
// Kits
// ──────────────────────────────────────────────

/// An equipment kit: gear plus the numeric bonuses it grants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Kit {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub equipment: KitEquipment,
    #[serde(default)]
    pub bonuses: KitBonuses,
    #[serde(default)]
    pub abilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KitEquipment {
    #[serde(default)]
    pub armor_type: String,
    #[serde(default)]
    pub shield: bool,
    #[serde(default)]
    pub weapons: Vec<KitWeapon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KitWeapon {
    #[serde(default)]
    pub amount: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Numeric bonuses granted by a kit. The scalar bonuses are grafted onto
/// the sheet during evaluation; the tiered damage bonuses and the ranged
/// distance bonus are decoded but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KitBonuses {
    #[serde(default)]
    pub stamina_bonus: i64,
    #[serde(default)]
    pub speed_bonus: i64,
    #[serde(default)]
    pub stability_bonus: i64,
    #[serde(default)]
    pub disengage_bonus: i64,
    #[serde(default, rename = "damage_bonus")]
    pub melee_damage_bonus: KitDamageBonus,
    #[serde(default)]
    pub ranged_damage_bonus: KitDamageBonus,
    #[serde(default)]
    pub ranged_distance_bonus: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct KitDamageBonus {
    #[serde(default)]
    pub tier_i: i64,
    #[serde(default)]
    pub tier_ii: i64,
    #[serde(default)]
    pub tier_iii: i64,
}

// ──────────────────────────────────────────────
// The catalog
// ──────────────────────────────────────────────

/// Read-only catalog of game content, indexed by identifier per kind.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    abilities: BTreeMap<String, Ability>,
    classes: BTreeMap<String, Class>,
    domains: BTreeMap<String, Domain>,
    features: BTreeMap<String, Feature>,
    kits: BTreeMap<String, Kit>,
    skills: BTreeMap<String, Skill>,
    skill_groups: BTreeMap<String, SkillGroup>,
}

impl Reference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_ability(&mut self, ability: Ability) {
        self.abilities.insert(ability.id.clone(), ability);
    }

    pub fn insert_class(&mut self, class: Class) {
        self.classes.insert(class.id.clone(), class);
    }

    pub fn insert_domain(&mut self, domain: Domain) {
        self.domains.insert(domain.id.clone(), domain);
    }

    pub fn insert_feature(&mut self, feature: Feature) {
        self.features.insert(feature.id.clone(), feature);
    }

    pub fn insert_kit(&mut self, kit: Kit) {
        self.kits.insert(kit.id.clone(), kit);
    }

    pub fn insert_skill(&mut self, skill: Skill) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn insert_skill_group(&mut self, group: SkillGroup) {
        self.skill_groups.insert(group.id.clone(), group);
    }

    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.get(id)
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.get(id)
    }

    pub fn domain(&self, id: &str) -> Option<&Domain> {
        self.domains.get(id)
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn kit(&self, id: &str) -> Option<&Kit> {
        self.kits.get(id)
    }

    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn skill_group(&self, id: &str) -> Option<&SkillGroup> {
        self.skill_groups.get(id)
    }

    pub fn has_ability(&self, id: &str) -> bool {
        self.abilities.contains_key(id)
    }

    pub fn has_domain(&self, id: &str) -> bool {
        self.domains.contains_key(id)
    }

    pub fn has_feature(&self, id: &str) -> bool {
        self.features.contains_key(id)
    }

    pub fn has_kit(&self, id: &str) -> bool {
        self.kits.contains_key(id)
    }

    pub fn has_skill(&self, id: &str) -> bool {
        self.skills.contains_key(id)
    }

    pub fn has_skill_group(&self, id: &str) -> bool {
        self.skill_groups.contains_key(id)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
