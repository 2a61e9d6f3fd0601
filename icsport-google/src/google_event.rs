use google_calendar::types::{
    Event as GoogleEvent, EventAttendee, EventDateTime as GoogleDateTime, Organizer as GoogleOrganizer,
};
use icsport_core::{Attendee, ConvertedEvent, EventDateTime, Organizer};

pub trait ToGoogle {
    fn to_google(&self) -> GoogleEvent;
}

impl ToGoogle for ConvertedEvent {
    fn to_google(&self) -> GoogleEvent {
        GoogleEvent {
            i_cal_uid: self.ical_uid.clone(),
            summary: self.summary.clone(),
            description: self.description.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            start: self.start.as_ref().map(date_time_to_google),
            end: self.end.as_ref().map(date_time_to_google),
            recurrence: self.recurrence.clone().unwrap_or_default(),
            original_start_time: self.original_start_time.as_ref().map(date_time_to_google),
            organizer: self.organizer.as_ref().map(organizer_to_google),
            attendees: self
                .attendees
                .iter()
                .flatten()
                .map(attendee_to_google)
                .collect(),
            ..Default::default()
        }
    }
}

fn date_time_to_google(time: &EventDateTime) -> GoogleDateTime {
    GoogleDateTime {
        date: time.date,
        date_time: time.date_time,
        time_zone: time.time_zone.clone(),
    }
}

fn organizer_to_google(organizer: &Organizer) -> GoogleOrganizer {
    GoogleOrganizer {
        email: organizer.email.clone(),
        display_name: organizer.display_name.clone(),
        id: String::new(),
        self_: false,
    }
}

fn attendee_to_google(attendee: &Attendee) -> EventAttendee {
    EventAttendee {
        email: attendee.email.clone(),
        display_name: attendee.display_name.clone().unwrap_or_default(),
        response_status: attendee.response_status.as_str().to_string(),
        additional_guests: 0,
        comment: String::new(),
        id: String::new(),
        optional: false,
        organizer: false,
        resource: false,
        self_: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use icsport_core::ResponseStatus;

    fn converted() -> ConvertedEvent {
        ConvertedEvent {
            summary: "Weekly sync".to_string(),
            description: None,
            location: Some("Room 2".to_string()),
            ical_uid: "sync-1@example.com".to_string(),
            start: Some(EventDateTime::instant(
                Utc.with_ymd_and_hms(2025, 3, 11, 14, 0, 0).unwrap(),
                "America/Chicago",
            )),
            end: Some(EventDateTime::instant(
                Utc.with_ymd_and_hms(2025, 3, 11, 15, 0, 0).unwrap(),
                "America/Chicago",
            )),
            recurrence: Some(vec!["RRULE:FREQ=WEEKLY;COUNT=4".to_string()]),
            organizer: Some(Organizer {
                email: "olga@example.com".to_string(),
                display_name: "Olga".to_string(),
            }),
            attendees: Some(vec![Attendee {
                email: "ann@example.com".to_string(),
                display_name: None,
                response_status: ResponseStatus::Tentative,
            }]),
            recurrence_exception: false,
            original_start_time: None,
        }
    }

    #[test]
    fn test_to_google_maps_fields() {
        let google = converted().to_google();

        assert!(google.id.is_empty());
        assert_eq!(google.i_cal_uid, "sync-1@example.com");
        assert_eq!(google.summary, "Weekly sync");
        assert_eq!(google.description, "");
        assert_eq!(google.location, "Room 2");
        assert_eq!(google.recurrence, vec!["RRULE:FREQ=WEEKLY;COUNT=4"]);

        let start = google.start.unwrap();
        assert_eq!(start.time_zone, "America/Chicago");
        assert_eq!(
            start.date_time,
            Some(Utc.with_ymd_and_hms(2025, 3, 11, 14, 0, 0).unwrap())
        );

        let organizer = google.organizer.unwrap();
        assert_eq!(organizer.email, "olga@example.com");
        assert_eq!(organizer.display_name, "Olga");
        assert!(organizer.id.is_empty());
        assert!(!organizer.self_);

        assert_eq!(google.attendees.len(), 1);
        assert_eq!(google.attendees[0].response_status, "tentative");
    }

    #[test]
    fn test_all_day_and_exception() {
        let mut event = converted();
        event.start = Some(EventDateTime::all_day(
            NaiveDate::from_ymd_opt(2025, 3, 18).unwrap(),
            "UTC",
        ));
        event.attendees = None;
        event.recurrence = None;
        event.recurrence_exception = true;
        event.original_start_time = Some(EventDateTime::instant(
            Utc.with_ymd_and_hms(2025, 3, 18, 14, 0, 0).unwrap(),
            "America/Chicago",
        ));

        let google = event.to_google();
        let start = google.start.unwrap();
        assert_eq!(start.date, NaiveDate::from_ymd_opt(2025, 3, 18));
        assert_eq!(start.date_time, None);
        assert!(google.attendees.is_empty());
        assert!(google.recurrence.is_empty());
        assert!(google.original_start_time.is_some());
    }
}
