//! Remote calendar interface used by the delivery loop.
//!
//! Implementations live in their own crates (see `icsport-google`). Every
//! call is scoped to the calendar the implementation was constructed for.

use thiserror::Error;

use crate::converted::{ConvertedEvent, EventDateTime};

/// A failed remote call.
///
/// `status` is the HTTP status when the transport reported one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", display_remote_error(.status, .message))]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

fn display_remote_error(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("[{}] {}", status, message),
        None => message.to_string(),
    }
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        RemoteError {
            status,
            message: message.into(),
        }
    }

    /// Build from a rendered error message.
    ///
    /// The status is only taken from a `Code: NNN` marker, the form HTTP
    /// client errors are printed in. Other numbers in the text are ignored.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let status = extract_status(&message);
        RemoteError { status, message }
    }

    /// The remote rejected a write because of a stale revision counter, or
    /// because the identifier already exists.
    pub fn is_sequence_conflict(&self) -> bool {
        if self.status == Some(409) {
            return true;
        }
        let lower = self.message.to_lowercase();
        lower.contains("sequence") && lower.contains("invalid")
    }

    /// The identifier is already taken (create rejected).
    pub fn is_duplicate_identifier(&self) -> bool {
        self.status == Some(409)
    }

    pub fn is_bad_request(&self) -> bool {
        self.status == Some(400)
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

fn extract_status(message: &str) -> Option<u16> {
    let lower = message.to_ascii_lowercase();
    let (_, rest) = lower.split_once("code:")?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 3 {
        return None;
    }
    digits.parse().ok().filter(|code| (400..=599).contains(code))
}

/// An event as it exists on the remote side.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub id: String,
    pub sequence: Option<i64>,
    /// Set when this is a modified occurrence of a series
    pub original_start_time: Option<EventDateTime>,
    /// Carries a recurrence rule (a series master)
    pub recurring: bool,
}

impl RemoteEvent {
    /// A standalone event or series master with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        RemoteEvent {
            id: id.into(),
            sequence: None,
            original_start_time: None,
            recurring: false,
        }
    }

    /// Does this remote copy occupy the same slot as `event`?
    ///
    /// Masters and standalone events only match records without an original
    /// start; modified occurrences only match the record replacing the same
    /// occurrence.
    pub fn is_copy_of(&self, event: &ConvertedEvent) -> bool {
        match (&self.original_start_time, &event.original_start_time) {
            (None, None) => true,
            (Some(remote), Some(local)) => remote.same_moment(local),
            _ => false,
        }
    }

    /// Same slot, and the same recurrence shape (series vs single event).
    pub fn can_be_replaced_by(&self, event: &ConvertedEvent) -> bool {
        self.is_copy_of(event) && self.recurring == event.recurrence.is_some()
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the delivery loop needs from a remote calendar.
#[allow(async_fn_in_trait)]
pub trait CalendarRemote {
    /// Every event carrying `ical_uid`: the master or standalone event plus
    /// any modified occurrences of it.
    async fn find_by_ical_uid(&self, ical_uid: &str) -> RemoteResult<Vec<RemoteEvent>>;

    /// The occurrence of series `series_id` originally scheduled at `original_start`.
    async fn find_instance(
        &self,
        series_id: &str,
        original_start: &EventDateTime,
    ) -> RemoteResult<Option<RemoteEvent>>;

    async fn create(&self, event: &ConvertedEvent) -> RemoteResult<RemoteEvent>;

    /// Replace an event without touching its revision counter.
    async fn update(&self, id: &str, event: &ConvertedEvent) -> RemoteResult<RemoteEvent>;

    /// Current revision counter, `None` when the remote doesn't report one.
    async fn fetch_sequence(&self, id: &str) -> RemoteResult<Option<i64>>;

    /// Replace an event, submitting `sequence` as its new revision counter.
    async fn update_with_sequence(
        &self,
        id: &str,
        event: &ConvertedEvent,
        sequence: i64,
    ) -> RemoteResult<RemoteEvent>;
}
