use std::path::Path;

use anyhow::{Context, Result};
use icsport_core::{Settings, aliases, ics};
use owo_colors::OwoColorize;

use crate::commands::load_alias_store;
use crate::prompt::DialoguerPrompter;
use crate::render::pluralize;

pub fn run(input: &Path) -> Result<()> {
    let settings = Settings::load()?;
    let mut store = load_alias_store(&settings)?;

    let events = ics::read_calendar_file(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    println!(
        "Checking organizers and attendees in {} {}...",
        events.len(),
        pluralize("event", events.len())
    );

    let summary = aliases::prepare(&mut store, &events, &mut DialoguerPrompter)?;

    if !summary.changed() && summary.skipped == 0 {
        println!("{}", "Every identity resolves, nothing to do.".green());
        return Ok(());
    }

    println!(
        "\nAdded {} {} and {} {}",
        summary.aliases_added,
        pluralize("alias", summary.aliases_added),
        summary.names_added,
        pluralize("name", summary.names_added)
    );
    if summary.skipped > 0 {
        println!(
            "{}",
            format!(
                "{} {} left unmapped; they will be dropped during conversion",
                summary.skipped,
                pluralize("identity", summary.skipped)
            )
            .yellow()
        );
    }

    Ok(())
}
