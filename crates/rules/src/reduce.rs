//! The choice reducer: compiles a player's decisions against a class's
//! declared choice points into operations.
//!
//! A choice with no recorded decision is silently skipped. A decided
//! choice reduces to operations according to its kind; this happens before
//! evaluation begins, so every error here is a data error, not an
//! evaluation error.

use std::collections::BTreeMap;

use crate::library::Reference;
use crate::types::{
    Choice, ChoiceKind, Decision, OpKind, Operation, RefKind, ResolveError, ValueRef,
};

/// Reduce one choice against the decisions map.
///
/// Returns `Ok(None)` when no decision is recorded for the choice.
pub fn reduce_choice(
    choice: &Choice,
    decisions: &BTreeMap<String, Decision>,
    reference: &Reference,
) -> Result<Option<Vec<Operation>>, ResolveError> {
    let Some(decision) = decisions.get(&choice.id) else {
        return Ok(None);
    };

    let operations = match (&choice.kind, decision) {
        (ChoiceKind::OptionSelect { options }, Decision::Option { option_id, .. }) => {
            let option = options
                .iter()
                .find(|o| o.id == *option_id)
                .ok_or_else(|| ResolveError::OptionNotFound {
                    choice_id: choice.id.clone(),
                    option_id: option_id.clone(),
                })?;

            // The choice's gating propagates onto its consequences: each
            // emitted operation inherits the choice's preconditions.
            option
                .operations
                .iter()
                .map(|op| {
                    let mut op = op.clone();
                    op.prereqs.extend(choice.prereqs.iter().cloned());
                    op
                })
                .collect()
        }
        (ChoiceKind::RefSelect { ref_type }, Decision::Ref { ref_id, .. }) => {
            vec![reduce_ref(ref_id, *ref_type, reference)?]
        }
        (ChoiceKind::Input, Decision::Input { target, value, .. }) => {
            vec![Operation {
                kind: OpKind::Set,
                target: target.clone(),
                value_ref: value.clone(),
                prereqs: Vec::new(),
            }]
        }
        (kind, _) => {
            let expected = match kind {
                ChoiceKind::OptionSelect { .. } => "id",
                ChoiceKind::RefSelect { .. } => "refid",
                ChoiceKind::Input => "value",
            };
            return Err(ResolveError::DecisionMismatch {
                choice_id: choice.id.clone(),
                expected,
            });
        }
    };

    Ok(Some(operations))
}

/// Reduce a selected reference id into the canonical add-operation for its
/// kind, validating the id against the library first.
///
/// Skill groups are rejected: groups are never added to a sheet.
fn reduce_ref(
    ref_id: &str,
    kind: RefKind,
    reference: &Reference,
) -> Result<Operation, ResolveError> {
    let exists = match kind {
        RefKind::Ability => reference.has_ability(ref_id),
        RefKind::AbilityModifier => return reduce_modifier_ref(ref_id, reference),
        RefKind::Domain => reference.has_domain(ref_id),
        RefKind::Feature => reference.has_feature(ref_id),
        RefKind::Kit => reference.has_kit(ref_id),
        RefKind::Skill => reference.has_skill(ref_id),
        RefKind::SkillGroup => return Err(ResolveError::UnsupportedRefKind { kind }),
    };
    if !exists {
        return Err(ResolveError::RefNotFound {
            kind,
            id: ref_id.to_string(),
        });
    }

    add_operation(ref_id, kind)
}

/// Ability modifier ids are dotted `ability_id.modifier_id`; both halves
/// must resolve.
fn reduce_modifier_ref(ref_id: &str, reference: &Reference) -> Result<Operation, ResolveError> {
    let Some((ability_id, modifier_id)) = ref_id.split_once('.') else {
        return Err(ResolveError::InvalidModifierId {
            id: ref_id.to_string(),
        });
    };
    if ability_id.is_empty() || modifier_id.is_empty() || modifier_id.contains('.') {
        return Err(ResolveError::InvalidModifierId {
            id: ref_id.to_string(),
        });
    }

    let ability = reference
        .ability(ability_id)
        .ok_or_else(|| ResolveError::RefNotFound {
            kind: RefKind::Ability,
            id: ability_id.to_string(),
        })?;
    if !ability.modifiers.contains_key(modifier_id) {
        return Err(ResolveError::ModifierNotFound {
            ability_id: ability_id.to_string(),
            modifier_id: modifier_id.to_string(),
        });
    }

    add_operation(ref_id, RefKind::AbilityModifier)
}

fn add_operation(ref_id: &str, kind: RefKind) -> Result<Operation, ResolveError> {
    let (op_kind, target) = match (kind.add_operation(), kind.collection_target()) {
        (Some(op_kind), Some(target)) => (op_kind, target),
        _ => return Err(ResolveError::UnsupportedRefKind { kind }),
    };
    Ok(Operation {
        kind: op_kind,
        target: target.to_string(),
        value_ref: ValueRef::Ref {
            id: ref_id.to_string(),
            kind,
        },
        prereqs: Vec::new(),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{Ability, AbilityModifier, Domain, Kit, Skill};
    use crate::types::{Assertion, SKILLS_TARGET};

    fn sample_reference() -> Reference {
        let mut reference = Reference::new();
        reference.insert_skill(Skill {
            id: "brag".to_string(),
            ..Skill::default()
        });
        reference.insert_domain(Domain {
            id: "war".to_string(),
            name: "War".to_string(),
        });
        reference.insert_kit(Kit {
            id: "dual_wielder".to_string(),
            ..Kit::default()
        });
        let mut ability = Ability {
            id: "halt_wretch".to_string(),
            ..Ability::default()
        };
        ability.modifiers.insert(
            "relentless".to_string(),
            AbilityModifier {
                id: "relentless".to_string(),
                ..AbilityModifier::default()
            },
        );
        reference.insert_ability(ability);
        reference
    }

    fn decisions_with(decision: Decision) -> BTreeMap<String, Decision> {
        let mut decisions = BTreeMap::new();
        decisions.insert(decision.choice_id().to_string(), decision);
        decisions
    }

    fn option_choice() -> Choice {
        serde_json::from_value(serde_json::json!({
            "id": "starting_characteristics",
            "type": "option_select",
            "prereqs": [
                {"type": "value", "target": "class_id",
                 "values": [{"type": "string", "value": "censor"}]}
            ],
            "options": [{
                "id": "m2_a1",
                "operations": [
                    {"type": "set", "target": "characteristics.might",
                     "value_ref": {"type": "int", "value": 2}},
                    {"type": "set", "target": "characteristics.agility",
                     "value_ref": {"type": "int", "value": 1}}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn undecided_choice_reduces_to_nothing() {
        let choice = option_choice();
        let result = reduce_choice(&choice, &BTreeMap::new(), &sample_reference()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn option_select_inherits_choice_prereqs() {
        let choice = option_choice();
        let decisions = decisions_with(Decision::Option {
            choice_id: "starting_characteristics".to_string(),
            option_id: "m2_a1".to_string(),
        });
        let ops = reduce_choice(&choice, &decisions, &sample_reference())
            .unwrap()
            .unwrap();
        assert_eq!(ops.len(), 2);
        for op in &ops {
            assert_eq!(op.prereqs.len(), 1);
            assert!(matches!(&op.prereqs[0], Assertion::Value { target, .. } if target == "class_id"));
        }
    }

    #[test]
    fn option_select_unknown_option_fails() {
        let choice = option_choice();
        let decisions = decisions_with(Decision::Option {
            choice_id: "starting_characteristics".to_string(),
            option_id: "nope".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(err, ResolveError::OptionNotFound { .. }));
    }

    #[test]
    fn option_select_rejects_wrong_decision_payload() {
        let choice = option_choice();
        let decisions = decisions_with(Decision::Ref {
            choice_id: "starting_characteristics".to_string(),
            ref_id: "brag".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DecisionMismatch { expected: "id", .. }
        ));
    }

    #[test]
    fn ref_select_emits_canonical_add_operation() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "basic_skill_1", "type": "ref_select", "ref_type": "skill"
        }))
        .unwrap();
        let decisions = decisions_with(Decision::Ref {
            choice_id: "basic_skill_1".to_string(),
            ref_id: "brag".to_string(),
        });
        let ops = reduce_choice(&choice, &decisions, &sample_reference())
            .unwrap()
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::AddSkill);
        assert_eq!(ops[0].target, SKILLS_TARGET);
        assert_eq!(
            ops[0].value_ref,
            ValueRef::Ref {
                id: "brag".to_string(),
                kind: RefKind::Skill
            }
        );
        // Reference-select operations do not inherit choice prereqs.
        assert!(ops[0].prereqs.is_empty());
    }

    #[test]
    fn ref_select_unknown_id_fails() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "basic_skill_1", "type": "ref_select", "ref_type": "skill"
        }))
        .unwrap();
        let decisions = decisions_with(Decision::Ref {
            choice_id: "basic_skill_1".to_string(),
            ref_id: "sneak".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::RefNotFound {
                kind: RefKind::Skill,
                ..
            }
        ));
    }

    #[test]
    fn ref_select_skill_group_is_rejected() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "skill_pool", "type": "ref_select", "ref_type": "skill_group"
        }))
        .unwrap();
        let decisions = decisions_with(Decision::Ref {
            choice_id: "skill_pool".to_string(),
            ref_id: "interpersonal".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnsupportedRefKind {
                kind: RefKind::SkillGroup
            }
        ));
    }

    #[test]
    fn modifier_ref_requires_dotted_form() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "signature_tweak", "type": "ref_select", "ref_type": "ability_modifier"
        }))
        .unwrap();

        for bad in ["relentless", "halt_wretch.relentless.extra", "halt_wretch."] {
            let decisions = decisions_with(Decision::Ref {
                choice_id: "signature_tweak".to_string(),
                ref_id: bad.to_string(),
            });
            let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
            assert!(
                matches!(err, ResolveError::InvalidModifierId { .. }),
                "expected invalid id for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn modifier_ref_validates_both_halves() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "signature_tweak", "type": "ref_select", "ref_type": "ability_modifier"
        }))
        .unwrap();

        let decisions = decisions_with(Decision::Ref {
            choice_id: "signature_tweak".to_string(),
            ref_id: "missing.relentless".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::RefNotFound {
                kind: RefKind::Ability,
                ..
            }
        ));

        let decisions = decisions_with(Decision::Ref {
            choice_id: "signature_tweak".to_string(),
            ref_id: "halt_wretch.missing".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(err, ResolveError::ModifierNotFound { .. }));

        let decisions = decisions_with(Decision::Ref {
            choice_id: "signature_tweak".to_string(),
            ref_id: "halt_wretch.relentless".to_string(),
        });
        let ops = reduce_choice(&choice, &decisions, &sample_reference())
            .unwrap()
            .unwrap();
        assert_eq!(ops[0].kind, OpKind::ModifyAbility);
        assert_eq!(ops[0].target, "ability_modifiers");
    }

    #[test]
    fn input_choice_emits_set_operation() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "player_note", "type": "input"
        }))
        .unwrap();
        let decisions = decisions_with(Decision::Input {
            choice_id: "player_note".to_string(),
            target: "class.note".to_string(),
            value: ValueRef::Str("hello".to_string()),
        });
        let ops = reduce_choice(&choice, &decisions, &sample_reference())
            .unwrap()
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::Set);
        assert_eq!(ops[0].target, "class.note");
        assert_eq!(ops[0].value_ref, ValueRef::Str("hello".to_string()));
    }

    #[test]
    fn input_choice_rejects_wrong_decision_payload() {
        let choice: Choice = serde_json::from_value(serde_json::json!({
            "id": "player_note", "type": "input"
        }))
        .unwrap();
        let decisions = decisions_with(Decision::Option {
            choice_id: "player_note".to_string(),
            option_id: "x".to_string(),
        });
        let err = reduce_choice(&choice, &decisions, &sample_reference()).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DecisionMismatch {
                expected: "value",
                ..
            }
        ));
    }
}
