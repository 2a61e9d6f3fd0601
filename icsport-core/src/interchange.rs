//! Newline-delimited JSON between the conversion and delivery phases.
//!
//! One [`ImportRecord`] per line: the converted event's fields at the top
//! level plus a `metadata` object describing where it came from.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::converted::ConvertedEvent;
use crate::error::{IcsPortError, IcsPortResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(flatten)]
    pub event: ConvertedEvent,
    pub metadata: ImportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    pub is_recurrence_exception: bool,
    pub has_recurrence: bool,
    #[serde(rename = "originalICalUID")]
    pub original_ical_uid: String,
    pub original_summary: String,
}

impl ImportRecord {
    /// Recurring series masters get a follow-up update after creation.
    pub fn needs_recurrence_update(&self) -> bool {
        self.metadata.has_recurrence && !self.metadata.is_recurrence_exception
    }

    pub fn to_line(&self) -> IcsPortResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Write records as NDJSON, one per line.
pub fn write_records<W: Write>(mut writer: W, records: &[ImportRecord]) -> IcsPortResult<()> {
    for record in records {
        writeln!(writer, "{}", record.to_line()?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read NDJSON records. Blank lines are skipped; line numbers in errors are 1-based.
pub fn read_records<R: BufRead>(reader: R) -> IcsPortResult<Vec<ImportRecord>> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: ImportRecord =
            serde_json::from_str(&line).map_err(|e| IcsPortError::Interchange {
                line: i + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }

    Ok(records)
}
