//! Terminal summaries for conversion and delivery runs.

use icsport_core::{DeliveryStats, ImportRecord};
use owo_colors::OwoColorize;

pub fn pluralize(word: &str, count: usize) -> &str {
    if count == 1 {
        word
    } else {
        match word {
            "event" => "events",
            "alias" => "aliases",
            "name" => "names",
            "identity" => "identities",
            _ => word,
        }
    }
}

pub fn render_conversion_summary(source_events: usize, records: &[ImportRecord]) -> String {
    let skipped = source_events.saturating_sub(records.len());
    let recurring = records
        .iter()
        .filter(|r| r.metadata.has_recurrence && !r.metadata.is_recurrence_exception)
        .count();
    let exceptions = records
        .iter()
        .filter(|r| r.metadata.is_recurrence_exception)
        .count();

    let mut lines = vec![format!(
        "Converted {} of {} {}",
        records.len().green(),
        source_events,
        pluralize("event", source_events)
    )];
    if recurring > 0 {
        lines.push(format!("   {} recurring {}", recurring, pluralize("series", recurring)));
    }
    if exceptions > 0 {
        lines.push(format!(
            "   {} modified {}",
            exceptions,
            if exceptions == 1 { "occurrence" } else { "occurrences" }
        ));
    }
    if skipped > 0 {
        lines.push(
            format!(
                "   {} expanded {} skipped",
                skipped,
                if skipped == 1 { "occurrence" } else { "occurrences" }
            )
            .dimmed()
            .to_string(),
        );
    }

    lines.join("\n")
}

pub fn render_stats(stats: &DeliveryStats) -> String {
    let mut parts = vec![format!("{} imported", stats.succeeded).green().to_string()];

    if stats.duplicates_skipped > 0 {
        parts.push(
            format!("{} already present", stats.duplicates_skipped)
                .dimmed()
                .to_string(),
        );
    }
    if stats.resumed > 0 {
        parts.push(format!("{} done in earlier runs", stats.resumed).dimmed().to_string());
    }
    if stats.failed > 0 {
        parts.push(format!("{} failed", stats.failed).red().to_string());
    }

    format!("\nImport finished: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("event", 1), "event");
        assert_eq!(pluralize("event", 0), "events");
        assert_eq!(pluralize("identity", 2), "identities");
        assert_eq!(pluralize("series", 3), "series");
    }

    #[test]
    fn test_render_stats_mentions_failures() {
        let stats = DeliveryStats {
            succeeded: 4,
            duplicates_skipped: 0,
            resumed: 2,
            failed: 1,
        };
        let rendered = render_stats(&stats);
        assert!(rendered.contains("4 imported"));
        assert!(rendered.contains("2 done in earlier runs"));
        assert!(rendered.contains("1 failed"));
        assert!(!rendered.contains("already present"));
    }
}
