//! Zone-name normalization and local-time projection.
//!
//! Calendars exported from Outlook/Exchange label times with Windows zone
//! names ("Central Standard Time") rather than IANA identifiers. The target
//! API only understands IANA names, so labels go through a fixed lookup table
//! before anything else looks at them.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

pub const DEFAULT_ZONE: &str = "UTC";

/// Map a zone label to an IANA identifier.
///
/// Known Windows names are translated, anything else passes through
/// unchanged, and an absent or blank label becomes `UTC`.
pub fn normalize_zone_name(label: Option<&str>) -> String {
    let label = match label.map(str::trim) {
        Some(l) if !l.is_empty() => l,
        _ => return DEFAULT_ZONE.to_string(),
    };

    windows_zone_to_iana(label)
        .map(str::to_string)
        .unwrap_or_else(|| label.to_string())
}

/// Interpret a wall-clock time in `zone` and return the UTC instant.
///
/// Unknown zones are treated as UTC. Times that fall into a DST gap are
/// shifted forward by an hour, which is what calendar clients do.
pub fn local_to_utc(datetime: &NaiveDateTime, zone: &str) -> DateTime<Utc> {
    let Ok(tz) = zone.parse::<Tz>() else {
        log::debug!("Unknown time zone '{}', treating {} as UTC", zone, datetime);
        return datetime.and_utc();
    };

    tz.from_local_datetime(datetime)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(*datetime + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| datetime.and_utc())
}

/// Whether `zone` names a zone we can compute offsets for.
pub fn is_known_zone(zone: &str) -> bool {
    zone.parse::<Tz>().is_ok()
}

fn windows_zone_to_iana(name: &str) -> Option<&'static str> {
    let iana = match name {
        "Dateline Standard Time" => "Etc/GMT+12",
        "UTC-11" => "Etc/GMT+11",
        "Hawaiian Standard Time" => "Pacific/Honolulu",
        "Alaskan Standard Time" => "America/Anchorage",
        "Pacific Standard Time" => "America/Los_Angeles",
        "Pacific Standard Time (Mexico)" => "America/Tijuana",
        "US Mountain Standard Time" => "America/Phoenix",
        "Mountain Standard Time" => "America/Denver",
        "Mountain Standard Time (Mexico)" => "America/Mazatlan",
        "Central America Standard Time" => "America/Guatemala",
        "Central Standard Time" => "America/Chicago",
        "Central Standard Time (Mexico)" => "America/Mexico_City",
        "Canada Central Standard Time" => "America/Regina",
        "SA Pacific Standard Time" => "America/Bogota",
        "Eastern Standard Time" => "America/New_York",
        "US Eastern Standard Time" => "America/Indiana/Indianapolis",
        "Venezuela Standard Time" => "America/Caracas",
        "Atlantic Standard Time" => "America/Halifax",
        "SA Western Standard Time" => "America/La_Paz",
        "Pacific SA Standard Time" => "America/Santiago",
        "Newfoundland Standard Time" => "America/St_Johns",
        "E. South America Standard Time" => "America/Sao_Paulo",
        "Argentina Standard Time" => "America/Argentina/Buenos_Aires",
        "SA Eastern Standard Time" => "America/Cayenne",
        "UTC" | "Coordinated Universal Time" => "UTC",
        "GMT Standard Time" => "Europe/London",
        "Greenwich Standard Time" => "Atlantic/Reykjavik",
        "W. Europe Standard Time" => "Europe/Berlin",
        "Central Europe Standard Time" => "Europe/Budapest",
        "Romance Standard Time" => "Europe/Paris",
        "Central European Standard Time" => "Europe/Warsaw",
        "W. Central Africa Standard Time" => "Africa/Lagos",
        "GTB Standard Time" => "Europe/Bucharest",
        "E. Europe Standard Time" => "Europe/Chisinau",
        "FLE Standard Time" => "Europe/Kyiv",
        "Israel Standard Time" => "Asia/Jerusalem",
        "Egypt Standard Time" => "Africa/Cairo",
        "South Africa Standard Time" => "Africa/Johannesburg",
        "Turkey Standard Time" => "Europe/Istanbul",
        "Russian Standard Time" => "Europe/Moscow",
        "Arab Standard Time" => "Asia/Riyadh",
        "Arabian Standard Time" => "Asia/Dubai",
        "Iran Standard Time" => "Asia/Tehran",
        "Pakistan Standard Time" => "Asia/Karachi",
        "India Standard Time" => "Asia/Kolkata",
        "Nepal Standard Time" => "Asia/Kathmandu",
        "Bangladesh Standard Time" => "Asia/Dhaka",
        "SE Asia Standard Time" => "Asia/Bangkok",
        "China Standard Time" => "Asia/Shanghai",
        "Singapore Standard Time" => "Asia/Singapore",
        "Taipei Standard Time" => "Asia/Taipei",
        "W. Australia Standard Time" => "Australia/Perth",
        "Tokyo Standard Time" => "Asia/Tokyo",
        "Korea Standard Time" => "Asia/Seoul",
        "Cen. Australia Standard Time" => "Australia/Adelaide",
        "AUS Central Standard Time" => "Australia/Darwin",
        "E. Australia Standard Time" => "Australia/Brisbane",
        "AUS Eastern Standard Time" => "Australia/Sydney",
        "Tasmania Standard Time" => "Australia/Hobart",
        "New Zealand Standard Time" => "Pacific/Auckland",
        _ => return None,
    };
    Some(iana)
}
