//! [`CalendarRemote`] backed by the Google Calendar API.

use anyhow::Result;
use google_calendar::types::{
    Event as GoogleEvent, EventDateTime as GoogleDateTime, OrderBy, SendUpdates,
};
use google_calendar::{Client, ClientError};
use icsport_core::{
    CalendarRemote, ConvertedEvent, EventDateTime, RemoteError, RemoteEvent, RemoteResult,
};

use crate::google_event::ToGoogle;
use crate::session::Session;

/// Google's alias for the user's main calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";

pub struct GoogleCalendar {
    client: Client,
    calendar_id: String,
}

impl GoogleCalendar {
    /// Open a client for `account`, refreshing its session if needed.
    pub async fn connect(account: &str, calendar_id: &str) -> Result<Self> {
        Ok(GoogleCalendar {
            client: Session::authorized_client(account).await?,
            calendar_id: calendar_id.to_string(),
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    async fn insert(&self, event: &GoogleEvent) -> RemoteResult<GoogleEvent> {
        let response = self
            .client
            .events()
            .insert(&self.calendar_id, 0, 0, false, SendUpdates::None, false, event)
            .await
            .map_err(to_remote_error)?;

        Ok(response.body)
    }

    async fn replace(&self, id: &str, event: &GoogleEvent) -> RemoteResult<GoogleEvent> {
        let response = self
            .client
            .events()
            .update(&self.calendar_id, id, 0, 0, false, SendUpdates::None, false, event)
            .await
            .map_err(to_remote_error)?;

        Ok(response.body)
    }
}

impl CalendarRemote for GoogleCalendar {
    async fn find_by_ical_uid(&self, ical_uid: &str) -> RemoteResult<Vec<RemoteEvent>> {
        let response = self
            .client
            .events()
            .list_all(
                &self.calendar_id,
                ical_uid,           // i_cal_uid
                0,                  // max_attendees
                OrderBy::default(), // order_by
                &[],                // private_extended_property
                "",                 // q (search query)
                &[],                // shared_extended_property
                false,              // show_deleted
                false,              // show_hidden_invitations
                false,              // single_events
                "",                 // time_max
                "",                 // time_min
                "",                 // time_zone
                "",                 // updated_min
            )
            .await
            .map_err(to_remote_error)?;

        // Masters come back together with their modified occurrences
        Ok(response
            .body
            .into_iter()
            .filter(|e| !e.id.is_empty() && e.status != "cancelled")
            .map(to_remote_event)
            .collect())
    }

    async fn find_instance(
        &self,
        series_id: &str,
        original_start: &EventDateTime,
    ) -> RemoteResult<Option<RemoteEvent>> {
        let original_start = match (original_start.date_time, original_start.date) {
            (Some(dt), _) => dt.to_rfc3339(),
            (None, Some(date)) => date.to_string(),
            (None, None) => return Ok(None),
        };

        let response = self
            .client
            .events()
            .instances(
                &self.calendar_id,
                series_id,
                0,               // max_attendees
                1,               // max_results
                &original_start, // original_start
                "",              // page_token
                false,           // show_deleted
                "",              // time_max
                "",              // time_min
                "",              // time_zone
            )
            .await
            .map_err(to_remote_error)?;

        Ok(response.body.into_iter().next().map(to_remote_event))
    }

    async fn create(&self, event: &ConvertedEvent) -> RemoteResult<RemoteEvent> {
        let created = self.insert(&event.to_google()).await?;
        log::debug!("Inserted {} into {}", event.ical_uid, self.calendar_id);
        Ok(to_remote_event(created))
    }

    async fn update(&self, id: &str, event: &ConvertedEvent) -> RemoteResult<RemoteEvent> {
        let updated = self.replace(id, &event.to_google()).await?;
        Ok(to_remote_event(updated))
    }

    async fn fetch_sequence(&self, id: &str) -> RemoteResult<Option<i64>> {
        let response = self
            .client
            .events()
            .get(&self.calendar_id, id, 0, "")
            .await
            .map_err(to_remote_error)?;

        Ok(Some(response.body.sequence))
    }

    async fn update_with_sequence(
        &self,
        id: &str,
        event: &ConvertedEvent,
        sequence: i64,
    ) -> RemoteResult<RemoteEvent> {
        let mut google_event = event.to_google();
        google_event.sequence = sequence;

        let updated = self.replace(id, &google_event).await?;
        Ok(to_remote_event(updated))
    }
}

fn to_remote_event(event: GoogleEvent) -> RemoteEvent {
    RemoteEvent {
        recurring: !event.recurrence.is_empty(),
        original_start_time: event.original_start_time.map(date_time_from_google),
        sequence: Some(event.sequence),
        id: event.id,
    }
}

fn date_time_from_google(time: GoogleDateTime) -> EventDateTime {
    EventDateTime {
        date_time: time.date_time,
        date: time.date,
        time_zone: time.time_zone,
    }
}

fn to_remote_error(e: ClientError) -> RemoteError {
    match e {
        ClientError::HttpError { status, error, .. } => {
            RemoteError::new(Some(status.as_u16()), error)
        }
        other => RemoteError::from_message(other.to_string()),
    }
}
