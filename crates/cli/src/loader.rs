//! Loads the reference library from a data directory.
//!
//! The directory holds one subdirectory per entity kind, each containing
//! one `<id>.json` file per entity:
//!
//! ```text
//! data/
//!   classes/censor.json
//!   skills/brag.json
//!   kits/dual_wielder.json
//!   ...
//! ```
//!
//! Missing kind directories are fine -- a data set only needs the kinds it
//! uses. Every present file is decoded eagerly, and its `id` field must
//! agree with its file name.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use herosheet_rules::library::{Ability, Class, Domain, Feature, Kit, Skill, SkillGroup};
use herosheet_rules::Reference;

/// All errors that can occur while loading the reference library.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("entity id \"{id}\" does not match file name in {path}")]
    IdMismatch { path: PathBuf, id: String },
}

/// Load every entity kind from `root` into a `Reference`.
pub fn load_reference(root: &Path) -> Result<Reference, LoadError> {
    let mut reference = Reference::new();

    load_kind(&root.join("abilities"), |a: &Ability| a.id.clone(), |a| {
        reference.insert_ability(a)
    })?;
    load_kind(&root.join("classes"), |c: &Class| c.id.clone(), |c| {
        reference.insert_class(c)
    })?;
    load_kind(&root.join("domains"), |d: &Domain| d.id.clone(), |d| {
        reference.insert_domain(d)
    })?;
    load_kind(&root.join("features"), |f: &Feature| f.id.clone(), |f| {
        reference.insert_feature(f)
    })?;
    load_kind(&root.join("kits"), |k: &Kit| k.id.clone(), |k| {
        reference.insert_kit(k)
    })?;
    load_kind(&root.join("skills"), |s: &Skill| s.id.clone(), |s| {
        reference.insert_skill(s)
    })?;
    load_kind(
        &root.join("skill_groups"),
        |g: &SkillGroup| g.id.clone(),
        |g| reference.insert_skill_group(g),
    )?;

    Ok(reference)
}

/// Decode every `*.json` file in one kind directory.
fn load_kind<T: DeserializeOwned>(
    dir: &Path,
    id_of: impl Fn(&T) -> String,
    mut insert: impl FnMut(T),
) -> Result<(), LoadError> {
    if !dir.is_dir() {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let entity: T = serde_json::from_str(&contents).map_err(|source| LoadError::Decode {
            path: path.clone(),
            source,
        })?;

        let id = id_of(&entity);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if id != stem {
            return Err(LoadError::IdMismatch { path, id });
        }

        tracing::debug!(path = %path.display(), id = %id, "loaded reference entity");
        insert(entity);
    }

    Ok(())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
