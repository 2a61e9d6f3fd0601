//! ICS parsing using the icalendar crate's parser.

use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{IcsPortError, IcsPortResult};
use crate::event::{CalendarEvent, Identity, SourceTime};
use crate::recurrence::RecurrenceRule;
use crate::timezone::normalize_zone_name;

/// Parse ICS content into its VEVENT components, in document order.
pub fn parse_calendar(content: &str) -> IcsPortResult<Vec<CalendarEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| IcsPortError::IcsParse(e.to_string()))?;

    Ok(calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(parse_event)
        .collect())
}

fn parse_event(vevent: &Component) -> CalendarEvent {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.as_ref().trim().to_string())
        .filter(|uid| !uid.is_empty());

    let summary = text_prop(vevent, "SUMMARY").unwrap_or_else(|| "(No title)".to_string());
    let description = text_prop(vevent, "DESCRIPTION");
    let location = text_prop(vevent, "LOCATION");

    let start = vevent.find_prop("DTSTART").and_then(parse_time);
    let end = vevent.find_prop("DTEND").and_then(parse_time);
    let recurrence_id = vevent.find_prop("RECURRENCE-ID").and_then(parse_time);

    // Floating UNTIL values are read in the series' own zone
    let zone = normalize_zone_name(start.as_ref().and_then(SourceTime::zone_label));
    let rrule = vevent
        .find_prop("RRULE")
        .map(|p| RecurrenceRule::parse(p.val.as_ref(), &zone));

    let organizer = vevent.find_prop("ORGANIZER").map(parse_identity);
    let attendees: Vec<Identity> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "ATTENDEE")
        .map(parse_identity)
        .collect();

    CalendarEvent {
        uid,
        summary,
        description,
        location,
        start,
        end,
        rrule,
        recurrence_id,
        organizer,
        attendees,
    }
}

fn text_prop(component: &Component, name: &str) -> Option<String> {
    component
        .find_prop(name)
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|s| !s.is_empty())
}

fn param<'a>(prop: &'a Property<'_>, key: &str) -> Option<&'a str> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_ref().trim_matches('"'))
}

/// Parse DTSTART/DTEND/RECURRENCE-ID. Unparseable values count as absent.
fn parse_time(prop: &Property) -> Option<SourceTime> {
    match DatePerhapsTime::try_from(prop) {
        Ok(dpt) => Some(to_source_time(dpt)),
        Err(e) => {
            log::warn!("Ignoring {} '{}': {}", prop.name, prop.val, e);
            None
        }
    }
}

fn to_source_time(dpt: DatePerhapsTime) -> SourceTime {
    match dpt {
        DatePerhapsTime::Date(d) => SourceTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => SourceTime::DateTimeUtc(dt),
            CalendarDateTime::Floating(naive) => SourceTime::DateTimeFloating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let tzid = tzid.trim_matches('"').trim();
                if tzid.is_empty() {
                    SourceTime::DateTimeFloating(date_time)
                } else {
                    SourceTime::DateTimeZoned {
                        datetime: date_time,
                        tzid: tzid.to_string(),
                    }
                }
            }
        },
    }
}

/// Parse ATTENDEE/ORGANIZER property
fn parse_identity(prop: &Property) -> Identity {
    let raw = prop.val.as_ref().trim();
    let address = match raw.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => &raw[7..],
        _ => raw,
    };

    Identity {
        email: Some(address.trim().to_string()).filter(|s| !s.is_empty()),
        name: param(prop, "CN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        status: param(prop, "PARTSTAT").map(str::to_string),
    }
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
