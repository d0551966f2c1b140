//! The `resolve` subcommand: load everything, run the resolver, print the
//! sheet.

use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use herosheet_model::{Character, Sheet};
use herosheet_rules::Decision;

use crate::loader;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_resolve(
    data_dir: &Path,
    character_path: &Path,
    decisions_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let reference = match loader::load_reference(data_dir) {
        Ok(reference) => reference,
        Err(e) => {
            report_error(&e.to_string());
            process::exit(1);
        }
    };

    let character: Character = match read_json(character_path) {
        Ok(character) => character,
        Err(message) => {
            report_error(&message);
            process::exit(1);
        }
    };

    let decisions = match decisions_path {
        Some(path) => match read_json::<Vec<Decision>>(path) {
            Ok(list) => list
                .into_iter()
                .map(|d| (d.choice_id().to_string(), d))
                .collect(),
            Err(message) => {
                report_error(&message);
                process::exit(1);
            }
        },
        None => BTreeMap::new(),
    };

    let sheet = match herosheet_rules::resolve(&character, &decisions, &reference) {
        Ok(sheet) => sheet,
        Err(e) => {
            report_error(&e.to_string());
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => match serde_json::to_string_pretty(&sheet) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                report_error(&format!("failed to serialize sheet: {}", e));
                process::exit(1);
            }
        },
        OutputFormat::Text => print_sheet(&sheet),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("failed to decode {}: {}", path.display(), e))
}

fn print_sheet(sheet: &Sheet) {
    println!(
        "Character: {} ({}, level {})",
        sheet.character_id, sheet.class_id, sheet.level
    );
    println!("Heroic resource: {}", sheet.heroic_resource);
    println!(
        "Characteristics: might {}, agility {}, reason {}, intuition {}, presence {}",
        sheet.characteristics.might,
        sheet.characteristics.agility,
        sheet.characteristics.reason,
        sheet.characteristics.intuition,
        sheet.characteristics.presence,
    );
    println!(
        "Health: max stamina {}, max recoveries {}",
        sheet.health.max_stamina, sheet.health.max_recoveries
    );
    println!(
        "Movement: speed {}, stability {}, disengage {}, size {} ({})",
        sheet.movement.speed,
        sheet.movement.stability,
        sheet.movement.disengage,
        sheet.movement.size.space,
        sheet.movement.size.kind,
    );
    println!(
        "Potencies: strong {}, average {}, weak {}",
        sheet.potencies.strong, sheet.potencies.average, sheet.potencies.weak
    );

    print_collection("Abilities", &sheet.abilities);
    print_collection("Ability modifiers", &sheet.ability_modifiers);
    print_collection("Domains", &sheet.domains);
    print_collection("Kits", &sheet.kits);
    print_collection("Features", &sheet.features);
    print_collection("Skills", &sheet.skills);

    if !sheet.class.is_empty() {
        println!("Class:");
        for (key, value) in &sheet.class {
            println!("  {}: {}", key, value);
        }
    }
}

fn print_collection(label: &str, items: &[String]) {
    if !items.is_empty() {
        println!("{}: {}", label, items.join(", "));
    }
}
