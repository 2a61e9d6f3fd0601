//! Recurrence rules: parsing RRULE values and translating them for the target API.
//!
//! Recurrence is passed through declaratively. Nothing here expands a rule
//! into instances.

use chrono::{DateTime, Utc, Weekday};
use rrule::{NWeekday, RRule, Unvalidated};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timezone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl From<rrule::Frequency> for Frequency {
    fn from(freq: rrule::Frequency) -> Self {
        match freq {
            rrule::Frequency::Secondly => Frequency::Secondly,
            rrule::Frequency::Minutely => Frequency::Minutely,
            rrule::Frequency::Hourly => Frequency::Hourly,
            rrule::Frequency::Daily => Frequency::Daily,
            rrule::Frequency::Weekly => Frequency::Weekly,
            rrule::Frequency::Monthly => Frequency::Monthly,
            rrule::Frequency::Yearly => Frequency::Yearly,
        }
    }
}

/// One BYDAY entry, e.g. `MO`, `2TU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{}", n)?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

impl From<&NWeekday> for WeekdayNum {
    fn from(day: &NWeekday) -> Self {
        match *day {
            NWeekday::Every(weekday) => WeekdayNum {
                ordinal: None,
                weekday,
            },
            NWeekday::Nth(n, weekday) => WeekdayNum {
                ordinal: i8::try_from(n).ok(),
                weekday,
            },
        }
    }
}

/// A structured RRULE. Every part is optional; a rule with nothing set
/// translates to no recurrence at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub freq: Option<Frequency>,
    pub interval: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub count: Option<u32>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i8>,
    pub by_month: Vec<u8>,
}

impl RecurrenceRule {
    /// Parse an RRULE property value (`FREQ=WEEKLY;COUNT=10;BYDAY=MO`).
    ///
    /// Parsing is lenient: unsupported keys are ignored and parts the rrule
    /// parser rejects are dropped with a warning, so the worst case is an
    /// empty rule. A rule without a usable FREQ is dropped entirely.
    /// `zone` is the event's (normalized) zone, used for floating UNTIL values.
    pub fn parse(value: &str, zone: &str) -> Self {
        let mut freq_part = None;
        let mut parts = Vec::new();

        for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, _)) = part.split_once('=') else {
                log::warn!("Ignoring malformed RRULE part '{}'", part);
                continue;
            };
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => freq_part = Some(part),
                "INTERVAL" | "UNTIL" | "COUNT" | "BYDAY" | "BYMONTHDAY" | "BYMONTH" => {
                    parts.push(part)
                }
                _ => log::debug!("Dropping unsupported RRULE part '{}'", part),
            }
        }

        let Some(freq_part) = freq_part else {
            log::warn!("Ignoring RRULE without FREQ '{}'", value);
            return RecurrenceRule::default();
        };
        if let Err(e) = freq_part.parse::<RRule<Unvalidated>>() {
            log::warn!("Ignoring RRULE with invalid frequency '{}': {}", freq_part, e);
            return RecurrenceRule::default();
        }

        // Check each part on its own so one bad part doesn't sink the rule
        let mut accepted = vec![freq_part];
        for part in parts {
            match format!("{};{}", freq_part, part).parse::<RRule<Unvalidated>>() {
                Ok(_) => accepted.push(part),
                Err(e) => log::warn!("Ignoring invalid RRULE part '{}': {}", part, e),
            }
        }

        let joined = accepted.join(";");
        let rrule = match joined.parse::<RRule<Unvalidated>>() {
            Ok(rrule) => rrule,
            Err(e) => {
                log::warn!("Ignoring unparseable RRULE '{}': {}", joined, e);
                return RecurrenceRule::default();
            }
        };

        let until_raw = accepted.iter().find_map(|p| {
            p.split_once('=')
                .filter(|(key, _)| key.eq_ignore_ascii_case("UNTIL"))
                .map(|(_, val)| val.trim())
        });

        RecurrenceRule {
            freq: Some(rrule.get_freq().into()),
            interval: Some(u32::from(rrule.get_interval())),
            until: rrule
                .get_until()
                .zip(until_raw)
                .map(|(until, raw)| until_to_utc(until, raw, zone)),
            count: rrule.get_count(),
            by_day: rrule.get_by_weekday().iter().map(WeekdayNum::from).collect(),
            by_month_day: keep_in_range("BYMONTHDAY", rrule.get_by_month_day(), |d| {
                *d != 0 && (-31..=31).contains(d)
            }),
            by_month: keep_in_range("BYMONTH", rrule.get_by_month(), |m| (1..=12).contains(m)),
        }
    }

    pub fn is_empty(&self) -> bool {
        translate(self).is_none()
    }
}

/// Render a rule in the target API's recurrence format (`RRULE:FREQ=...`).
///
/// Token order is fixed: FREQ, INTERVAL, UNTIL, COUNT, BYDAY, BYMONTHDAY,
/// BYMONTH. Returns `None` instead of an empty rule string.
pub fn translate(rule: &RecurrenceRule) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(freq) = rule.freq {
        parts.push(format!("FREQ={}", freq.as_str()));
    }
    if let Some(interval) = rule.interval.filter(|i| *i > 1) {
        parts.push(format!("INTERVAL={}", interval));
    }
    if let Some(until) = rule.until {
        parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
    }
    if let Some(count) = rule.count {
        parts.push(format!("COUNT={}", count));
    }
    if !rule.by_day.is_empty() {
        parts.push(format!("BYDAY={}", join(&rule.by_day)));
    }
    if !rule.by_month_day.is_empty() {
        parts.push(format!("BYMONTHDAY={}", join(&rule.by_month_day)));
    }
    if !rule.by_month.is_empty() {
        parts.push(format!("BYMONTH={}", join(&rule.by_month)));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("RRULE:{}", parts.join(";")))
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn keep_in_range<T: Copy + fmt::Display>(key: &str, items: &[T], valid: impl Fn(&T) -> bool) -> Vec<T> {
    items
        .iter()
        .copied()
        .filter(|item| {
            let ok = valid(item);
            if !ok {
                log::warn!("Ignoring out-of-range RRULE {} entry '{}'", key, item);
            }
            ok
        })
        .collect()
}

/// UNTIL comes in three shapes: UTC date-time, floating date-time, or a bare date.
///
/// The parser reads floating and date-only values as wall-clock time, so the
/// raw text decides which shape it was.
fn until_to_utc(until: &DateTime<rrule::Tz>, raw: &str, zone: &str) -> DateTime<Utc> {
    if raw.ends_with('Z') || raw.ends_with('z') {
        return until.with_timezone(&Utc);
    }

    let wall_clock = until.naive_local();
    if !raw.contains(['T', 't']) {
        // A date-only UNTIL is inclusive of that whole day
        return wall_clock
            .date()
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| wall_clock.and_utc());
    }

    timezone::local_to_utc(&wall_clock, zone)
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
