pub mod convert;
pub mod import;
pub mod prepare;
pub mod reset;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use icsport_core::interchange::read_records;
use icsport_core::{AliasStore, EventConverter, IcsPortError, ImportRecord, Settings, ics};

/// Load the identity tables named in the settings.
pub fn load_alias_store(settings: &Settings) -> Result<AliasStore> {
    let aliases_path = settings.aliases_path()?;
    let names_path = settings.names_path()?;

    AliasStore::load(&aliases_path, &names_path).with_context(|| {
        format!(
            "Failed to load identity tables ({}, {})",
            aliases_path.display(),
            names_path.display()
        )
    })
}

/// Whether `path` holds already converted records rather than ICS.
pub fn is_interchange_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    )
}

/// Read import records from a .jsonl file, or convert an .ics file in memory.
pub fn load_records(path: &Path, settings: &Settings) -> Result<Vec<ImportRecord>> {
    if !path.exists() {
        return Err(IcsPortError::InputNotFound(path.to_path_buf()).into());
    }

    if is_interchange_file(path) {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let records = read_records(BufReader::new(file))
            .with_context(|| format!("Failed to read records from {}", path.display()))?;
        return Ok(records);
    }

    let events = ics::read_calendar_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let store = load_alias_store(settings)?;
    let resolver = store.resolver();

    Ok(EventConverter::new(&resolver).convert_all(&events))
}
