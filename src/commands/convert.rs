use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use icsport_core::interchange::write_records;
use icsport_core::{EventConverter, Settings, ics};

use crate::commands::load_alias_store;
use crate::render;

pub fn run(input: &Path, output: Option<&Path>) -> Result<()> {
    let settings = Settings::load()?;
    let store = load_alias_store(&settings)?;
    let resolver = store.resolver();

    let events = ics::read_calendar_file(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = EventConverter::new(&resolver).convert_all(&events);

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_records(BufWriter::new(file), &records)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => write_records(io::stdout().lock(), &records)?,
    }

    // stdout may carry the records, so the summary goes to stderr
    eprintln!("{}", render::render_conversion_summary(events.len(), &records));
    if let Some(path) = output {
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}
