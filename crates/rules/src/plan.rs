//! The operation planner: gathers every operation that applies to a
//! character into a target-keyed plan.
//!
//! Order within a target is the order operations were gathered: class
//! basics first, then each level the character has reached in ascending
//! order, then reduced choice operations. Reads of another target always
//! go through the memoized evaluator, so ordering across targets is not
//! observable.

use std::collections::BTreeMap;

use crate::library::{Class, Reference};
use crate::reduce::reduce_choice;
use crate::types::{Decision, Operation, ResolveError};

/// A target-keyed plan of operations, preserving per-target order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    by_target: BTreeMap<String, Vec<Operation>>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation under its target.
    pub fn push(&mut self, operation: Operation) {
        self.by_target
            .entry(operation.target.clone())
            .or_default()
            .push(operation);
    }

    /// The queued operations for a target, in application order.
    pub fn operations(&self, target: &str) -> Option<&[Operation]> {
        self.by_target.get(target).map(Vec::as_slice)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.by_target.contains_key(target)
    }

    /// All planned targets, in deterministic order.
    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.by_target.keys()
    }
}

/// Build the plan for a character of the given level: basics, then every
/// level block with key `<= level` ascending, then each decided choice
/// reduced to its operations.
pub fn build_plan(
    class: &Class,
    level: i64,
    decisions: &BTreeMap<String, Decision>,
    reference: &Reference,
) -> Result<Plan, ResolveError> {
    let mut operations: Vec<Operation> = Vec::new();
    operations.extend(class.basics.operations.iter().cloned());
    for (class_level, block) in &class.levels {
        if i64::from(*class_level) <= level {
            operations.extend(block.operations.iter().cloned());
        }
    }

    let mut choices = Vec::new();
    choices.extend(class.basics.choices.iter());
    for (class_level, block) in &class.levels {
        if i64::from(*class_level) <= level {
            choices.extend(block.choices.iter());
        }
    }

    // Reducing a choice does not mean its operations will run: assertions
    // carried over from the choice can still gate them out at evaluation.
    for choice in choices {
        if let Some(reduced) = reduce_choice(choice, decisions, reference)? {
            operations.extend(reduced);
        }
    }

    let mut plan = Plan::new();
    for operation in operations {
        plan.push(operation);
    }
    Ok(plan)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
