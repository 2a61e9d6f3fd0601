//! Source-side event types.
//!
//! These mirror what an iCalendar `VEVENT` carries before any conversion:
//! raw identities, raw participation statuses and times still attached to
//! whatever zone label the document used.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recurrence::RecurrenceRule;

/// A calendar event as read from an ICS document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<SourceTime>,
    pub end: Option<SourceTime>,

    /// Structured RRULE, if the component had one
    pub rrule: Option<RecurrenceRule>,
    /// RECURRENCE-ID: marks this component as an override of one instance
    pub recurrence_id: Option<SourceTime>,

    pub organizer: Option<Identity>,
    pub attendees: Vec<Identity>,
}

impl CalendarEvent {
    pub fn is_recurrence_exception(&self) -> bool {
        self.recurrence_id.is_some()
    }
}

/// A raw organizer/attendee reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Address with any `mailto:` prefix removed. Not necessarily a valid email.
    pub email: Option<String>,
    /// CN parameter
    pub name: Option<String>,
    /// PARTSTAT parameter, verbatim
    pub status: Option<String>,
}

/// A DTSTART/DTEND/RECURRENCE-ID value, preserving how the document expressed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl SourceTime {
    /// The zone label attached to this value, if any.
    pub fn zone_label(&self) -> Option<&str> {
        match self {
            SourceTime::DateTimeZoned { tzid, .. } => Some(tzid),
            SourceTime::DateTimeUtc(_) => Some("UTC"),
            SourceTime::Date(_) | SourceTime::DateTimeFloating(_) => None,
        }
    }
}

impl fmt::Display for SourceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SourceTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            SourceTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            SourceTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}
