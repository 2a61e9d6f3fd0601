//! Target-side event types, shaped like the remote calendar's JSON resource.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event ready for upload.
///
/// `attendees` is either absent or non-empty. `ical_uid` is always set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedEvent {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "iCalUID")]
    pub ical_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Organizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recurrence_exception: bool,
    /// Scheduled start of the instance a recurrence exception replaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start_time: Option<EventDateTime>,
}

/// A start/end value: a UTC instant (or an all-day date) plus an IANA zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub time_zone: String,
}

impl EventDateTime {
    pub fn instant(date_time: DateTime<Utc>, time_zone: impl Into<String>) -> Self {
        EventDateTime {
            date_time: Some(date_time),
            date: None,
            time_zone: time_zone.into(),
        }
    }

    pub fn all_day(date: NaiveDate, time_zone: impl Into<String>) -> Self {
        EventDateTime {
            date_time: None,
            date: Some(date),
            time_zone: time_zone.into(),
        }
    }

    /// Same instant or date, regardless of the zone label.
    pub fn same_moment(&self, other: &EventDateTime) -> bool {
        self.date_time == other.date_time && self.date == other.date
    }
}

impl fmt::Display for EventDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.date_time, self.date) {
            (Some(dt), _) => write!(f, "{} ({})", dt.to_rfc3339(), self.time_zone),
            (None, Some(d)) => write!(f, "{} ({})", d, self.time_zone),
            (None, None) => write!(f, "({})", self.time_zone),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub response_status: ResponseStatus,
}

/// Attendee response status in the target vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    #[default]
    NeedsAction,
}

impl ResponseStatus {
    /// Map an iCalendar PARTSTAT value. Unknown or missing values become `NeedsAction`.
    pub fn from_partstat(partstat: Option<&str>) -> Self {
        match partstat.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("ACCEPTED") => ResponseStatus::Accepted,
            Some("DECLINED") => ResponseStatus::Declined,
            Some("TENTATIVE") => ResponseStatus::Tentative,
            _ => ResponseStatus::NeedsAction,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Declined => "declined",
            ResponseStatus::Tentative => "tentative",
            ResponseStatus::NeedsAction => "needsAction",
        }
    }
}
