//! Reading iCalendar documents.

mod parse;

use std::path::Path;

use crate::error::{IcsPortError, IcsPortResult};
use crate::event::CalendarEvent;

pub use parse::parse_calendar;

/// Read and parse an .ics file into its events, in document order.
pub fn read_calendar_file(path: &Path) -> IcsPortResult<Vec<CalendarEvent>> {
    if !path.exists() {
        return Err(IcsPortError::InputNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    parse_calendar(&content)
}
