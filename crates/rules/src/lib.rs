//! Declarative rules resolver -- derives a fully-computed character sheet
//! from a character descriptor, the player's decisions, and the reference
//! library of static game content.
//!
//! The pipeline: the planner walks the class's basics plus every reached
//! level and gathers operations into a target-keyed plan, reducing each
//! decided choice into additional operations along the way; the evaluator
//! then resolves every planned target lazily, with `id` references pulling
//! dependencies on demand; finally the flat value map is unflattened and
//! shaped into the typed sheet.
//!
//! Resolution is deterministic and pure: the same inputs always produce
//! the same sheet. The reference library is read-only and can be shared
//! across resolutions; each resolution owns its working state.

pub mod library;
pub mod plan;
pub mod reduce;
pub mod resolver;
pub mod sheet;
pub mod trace;
pub mod types;

use std::collections::BTreeMap;

use herosheet_model::{Character, Sheet};

pub use library::Reference;
pub use resolver::Resolver;
pub use types::{Decision, ResolveError, Value};

/// Resolve a character sheet.
///
/// This is the top-level public API. `decisions` is keyed by choice id; a
/// choice with no recorded decision is skipped, which is not an error.
pub fn resolve(
    character: &Character,
    decisions: &BTreeMap<String, Decision>,
    reference: &Reference,
) -> Result<Sheet, ResolveError> {
    Resolver::new(character, decisions, reference).resolve()
}

// ──────────────────────────────────────────────
// Integration tests
// ──────────────────────────────────────────────
