//! Sheet assembly: shaping the flat target-to-value map into the typed
//! sheet.
//!
//! Dotted targets are unflattened by splitting on `.`, with each leading
//! part creating a nested map. The nested tree is then decoded into the
//! typed `Sheet`; a required scalar with no value is a fatal error, while
//! collections and the freeform class subtree default to empty.

use std::collections::BTreeMap;

use herosheet_model::Sheet;

use crate::types::{ResolveError, Value};

/// Assemble the typed sheet from the resolved flat value map.
pub fn assemble(values: BTreeMap<String, Value>) -> Result<Sheet, ResolveError> {
    let tree = unflatten(values)?;
    let json = Value::Map(tree).to_json();
    serde_json::from_value(json).map_err(|error| ResolveError::Assembly {
        message: error.to_string(),
    })
}

/// Split dotted keys into a nested map tree.
fn unflatten(values: BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>, ResolveError> {
    let mut root: BTreeMap<String, Value> = BTreeMap::new();

    for (key, value) in values {
        let mut parts = key.split('.').peekable();
        let mut current = &mut root;
        loop {
            let part = parts.next().unwrap_or_default();
            if parts.peek().is_none() {
                current.insert(part.to_string(), value);
                break;
            }
            let node = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            match node {
                Value::Map(children) => current = children,
                _ => {
                    return Err(ResolveError::Assembly {
                        message: format!(
                            "target \"{}\" nests under a non-map value at \"{}\"",
                            key, part
                        ),
                    });
                }
            }
        }
    }

    Ok(root)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
