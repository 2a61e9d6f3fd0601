//! Source event → target event conversion.
//!
//! Every outcome is explicit: a full record, a record with a participant
//! field omitted, or `None` for an event that must not be uploaded at all.

use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::converted::{Attendee, ConvertedEvent, EventDateTime, Organizer, ResponseStatus};
use crate::event::{CalendarEvent, Identity, SourceTime};
use crate::identity::IdentityResolver;
use crate::interchange::{ImportMetadata, ImportRecord};
use crate::recurrence;
use crate::timezone::{local_to_utc, normalize_zone_name};

pub struct EventConverter<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> EventConverter<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        EventConverter { resolver }
    }

    /// Convert every event in document order, dropping the ones that are skipped.
    pub fn convert_all(&self, events: &[CalendarEvent]) -> Vec<ImportRecord> {
        events.iter().filter_map(|e| self.convert(e)).collect()
    }

    pub fn convert(&self, event: &CalendarEvent) -> Option<ImportRecord> {
        let is_exception = event.is_recurrence_exception();

        // Occurrences exported one-per-instance are represented by their series
        if !is_exception && event.uid.as_deref().is_some_and(is_materialized_instance) {
            log::debug!(
                "Skipping materialized occurrence {}",
                event.uid.as_deref().unwrap_or_default()
            );
            return None;
        }

        let ical_uid = match event.uid.as_deref().map(str::trim) {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => {
                let generated = generate_uid();
                log::warn!(
                    "Event '{}' has no UID, using generated {}",
                    event.summary,
                    generated
                );
                generated
            }
        };

        let recurrence = event
            .rrule
            .as_ref()
            .and_then(recurrence::translate)
            .map(|rule| vec![rule]);

        let converted = ConvertedEvent {
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            ical_uid: ical_uid.clone(),
            start: event.start.as_ref().map(project_time),
            end: event.end.as_ref().map(project_time),
            recurrence,
            organizer: event.organizer.as_ref().and_then(|o| self.organizer(o)),
            attendees: self.attendees(&event.attendees),
            recurrence_exception: is_exception,
            original_start_time: event.recurrence_id.as_ref().map(project_time),
        };

        let metadata = ImportMetadata {
            is_recurrence_exception: is_exception,
            has_recurrence: converted.recurrence.is_some(),
            original_ical_uid: ical_uid,
            original_summary: event.summary.clone(),
        };

        Some(ImportRecord {
            event: converted,
            metadata,
        })
    }

    fn organizer(&self, organizer: &Identity) -> Option<Organizer> {
        let Some(resolved) = self
            .resolver
            .resolve(organizer.email.as_deref(), organizer.name.as_deref())
        else {
            log::debug!("Omitting unresolved organizer {:?}", organizer);
            return None;
        };

        Some(Organizer {
            display_name: resolved
                .display_name
                .unwrap_or_else(|| resolved.email.clone()),
            email: resolved.email,
        })
    }

    fn attendees(&self, attendees: &[Identity]) -> Option<Vec<Attendee>> {
        let resolved: Vec<Attendee> = attendees
            .iter()
            .filter_map(|a| {
                let identity = self.resolver.resolve(a.email.as_deref(), a.name.as_deref());
                if identity.is_none() {
                    log::debug!("Dropping unresolved attendee {:?}", a);
                }
                identity.map(|i| Attendee {
                    email: i.email,
                    display_name: i.display_name,
                    response_status: ResponseStatus::from_partstat(a.status.as_deref()),
                })
            })
            .collect();

        (!resolved.is_empty()).then_some(resolved)
    }
}

/// `<series>_R<YYYYMMDD>[T<HHMMSS>[Z]]<suffix>`
static MATERIALIZED_INSTANCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^.+_R\d{8}(T\d{6}Z?)?"));

/// Whether `uid` is one occurrence of a series that some exporters write out
/// as its own component.
pub fn is_materialized_instance(uid: &str) -> bool {
    MATERIALIZED_INSTANCE
        .as_ref()
        .is_ok_and(|re| re.is_match(uid))
}

fn project_time(time: &SourceTime) -> EventDateTime {
    let zone = normalize_zone_name(time.zone_label());
    match time {
        SourceTime::Date(d) => EventDateTime::all_day(*d, zone),
        SourceTime::DateTimeUtc(dt) => EventDateTime::instant(*dt, zone),
        SourceTime::DateTimeFloating(naive) => EventDateTime::instant(naive.and_utc(), zone),
        SourceTime::DateTimeZoned { datetime, .. } => {
            EventDateTime::instant(local_to_utc(datetime, &zone), zone)
        }
    }
}

/// Fallback identifier for components without a UID. Not stable across runs.
fn generate_uid() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}@icsport",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        &random[..12]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_calendar;
    use std::collections::BTreeMap;

    const SCENARIO: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//Test//EN\r
BEGIN:VEVENT\r
UID:e1\r
SUMMARY:Plain\r
DTSTART:20250310T150000Z\r
DTEND:20250310T160000Z\r
ORGANIZER;CN=Olga:mailto:olga@example.com\r
ATTENDEE;CN=Ann;PARTSTAT=ACCEPTED:mailto:ann@example.com\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:e2\r
SUMMARY:Weekly sync\r
DTSTART;TZID=Central Standard Time:20250311T090000\r
DTEND;TZID=Central Standard Time:20250311T093000\r
RRULE:FREQ=WEEKLY;COUNT=10\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:e2\r
SUMMARY:Weekly sync (moved)\r
RECURRENCE-ID;TZID=Central Standard Time:20250318T090000\r
DTSTART;TZID=Central Standard Time:20250318T110000\r
DTEND;TZID=Central Standard Time:20250318T113000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:e2_R20250325T150000\r
SUMMARY:Weekly sync\r
DTSTART:20250325T150000Z\r
DTEND:20250325T153000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:e5\r
SUMMARY:Name-only organizer\r
DTSTART:20250312T100000Z\r
DTEND:20250312T110000Z\r
ORGANIZER;CN=Mystery Person:mailto:\r
END:VEVENT\r
END:VCALENDAR\r
";

    fn empty_resolver() -> IdentityResolver {
        IdentityResolver::default()
    }

    #[test]
    fn test_concrete_scenario() {
        let events = parse_calendar(SCENARIO).unwrap();
        assert_eq!(events.len(), 5);

        let resolver = empty_resolver();
        let records = EventConverter::new(&resolver).convert_all(&events);
        assert_eq!(records.len(), 4);

        let uids: Vec<&str> = records.iter().map(|r| r.event.ical_uid.as_str()).collect();
        assert_eq!(uids, vec!["e1", "e2", "e2", "e5"]);

        let plain = &records[0].event;
        assert_eq!(plain.organizer.as_ref().unwrap().email, "olga@example.com");
        let attendees = plain.attendees.as_ref().unwrap();
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].response_status, ResponseStatus::Accepted);

        let weekly = &records[1];
        let rule = &weekly.event.recurrence.as_ref().unwrap()[0];
        assert!(rule.contains("FREQ=WEEKLY"));
        assert!(rule.contains("COUNT=10"));
        assert!(weekly.metadata.has_recurrence);
        assert_eq!(
            weekly.event.start.as_ref().unwrap().time_zone,
            "America/Chicago"
        );

        let exception = &records[2];
        assert!(exception.event.recurrence_exception);
        assert!(exception.metadata.is_recurrence_exception);
        let original = exception.event.original_start_time.as_ref().unwrap();
        assert_eq!(
            original.date_time.unwrap().to_rfc3339(),
            "2025-03-18T14:00:00+00:00"
        );

        let name_only = &records[3].event;
        assert!(name_only.organizer.is_none());
    }

    #[test]
    fn test_instance_pattern() {
        assert!(is_materialized_instance("abc_R20250101"));
        assert!(is_materialized_instance("abc_R20250101T090000"));
        assert!(is_materialized_instance("abc_R20250101T090000Z@google.com"));
        assert!(!is_materialized_instance("_R20250101"));
        assert!(!is_materialized_instance("abc_R2025"));
        assert!(!is_materialized_instance("abc_Rx20250101"));
        assert!(!is_materialized_instance("plain-uid@example.com"));
    }

    #[test]
    fn test_exception_is_never_suppressed() {
        let event = CalendarEvent {
            uid: Some("series_R20250101".to_string()),
            summary: "Override".to_string(),
            recurrence_id: Some(SourceTime::Date(
                chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            )),
            ..Default::default()
        };
        let resolver = empty_resolver();
        assert!(EventConverter::new(&resolver).convert(&event).is_some());
    }

    #[test]
    fn test_missing_uid_gets_generated_identifier() {
        let event = CalendarEvent {
            summary: "No uid".to_string(),
            ..Default::default()
        };
        let resolver = empty_resolver();
        let converter = EventConverter::new(&resolver);
        let a = converter.convert(&event).unwrap();
        let b = converter.convert(&event).unwrap();
        assert!(a.event.ical_uid.ends_with("@icsport"));
        assert_ne!(a.event.ical_uid, b.event.ical_uid);
        assert_eq!(a.metadata.original_ical_uid, a.event.ical_uid);
    }

    #[test]
    fn test_unresolvable_attendees_leave_field_absent() {
        let event = CalendarEvent {
            uid: Some("x".to_string()),
            attendees: vec![
                Identity {
                    name: Some("Nobody".to_string()),
                    ..Default::default()
                },
                Identity {
                    email: Some("not-an-email".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let resolver = empty_resolver();
        let record = EventConverter::new(&resolver).convert(&event).unwrap();
        assert_eq!(record.event.attendees, None);
    }

    #[test]
    fn test_attendees_filtered_individually() {
        let names = BTreeMap::from([("Ann".to_string(), "ann@example.com".to_string())]);
        let resolver = IdentityResolver::new(BTreeMap::new(), names);
        let event = CalendarEvent {
            uid: Some("x".to_string()),
            attendees: vec![
                Identity {
                    name: Some("Ann".to_string()),
                    status: Some("TENTATIVE".to_string()),
                    ..Default::default()
                },
                Identity {
                    name: Some("Unknown".to_string()),
                    ..Default::default()
                },
                Identity {
                    email: Some("bo@example.com".to_string()),
                    status: Some("X-WEIRD".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let record = EventConverter::new(&resolver).convert(&event).unwrap();
        let attendees = record.event.attendees.unwrap();
        assert_eq!(attendees.len(), 2);
        assert_eq!(attendees[0].email, "ann@example.com");
        assert_eq!(attendees[0].response_status, ResponseStatus::Tentative);
        assert_eq!(attendees[1].response_status, ResponseStatus::NeedsAction);
    }

    #[test]
    fn test_organizer_display_name_falls_back_to_email() {
        let event = CalendarEvent {
            uid: Some("x".to_string()),
            organizer: Some(Identity {
                email: Some("boss@example.com".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolver = empty_resolver();
        let organizer = EventConverter::new(&resolver)
            .convert(&event)
            .unwrap()
            .event
            .organizer
            .unwrap();
        assert_eq!(organizer.display_name, "boss@example.com");
    }

    #[test]
    fn test_empty_rule_emits_no_recurrence() {
        let event = CalendarEvent {
            uid: Some("x".to_string()),
            rrule: Some(Default::default()),
            ..Default::default()
        };
        let resolver = empty_resolver();
        let record = EventConverter::new(&resolver).convert(&event).unwrap();
        assert_eq!(record.event.recurrence, None);
        assert!(!record.metadata.has_recurrence);
    }

    #[test]
    fn test_floating_time_defaults_to_utc() {
        let naive = chrono::NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let projected = project_time(&SourceTime::DateTimeFloating(naive));
        assert_eq!(projected.time_zone, "UTC");
        assert_eq!(projected.date_time, Some(naive.and_utc()));
    }
}
