//! Permissive date resolution
//!
//! Forum markup mixes ISO `datetime` attributes with human-language relative
//! and absolute strings depending on theme and locale. `DateResolver` turns
//! any of them into an absolute UTC timestamp and never fails: input it cannot
//! make sense of resolves to `now`.

use crate::dates::DateLocale;
use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Naive ISO layouts accepted after RFC 3339 fails, interpreted as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-bearing layouts RFC 3339 does not cover (`+0100`)
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})[:.](\d{2})(?:\s*([ap])\.?\s*m\b)?").expect("valid time regex")
    })
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid number regex"))
}

/// Resolves raw date strings into absolute timestamps
#[derive(Debug, Clone)]
pub struct DateResolver {
    locales: Vec<DateLocale>,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(vec![DateLocale::SPANISH, DateLocale::ENGLISH])
    }
}

impl DateResolver {
    /// Creates a resolver that recognises the given locales, in order
    pub fn new(locales: Vec<DateLocale>) -> Self {
        Self { locales }
    }

    /// Resolves `raw` relative to `now`
    ///
    /// # Recognition order (first match wins)
    ///
    /// 1. ISO-8601, with or without offset (`Z` included); naive values are UTC
    /// 2. "today" marker with optional `HH:MM` / `HH.MM`
    /// 3. "yesterday" marker with optional time, midnight otherwise
    /// 4. "N minutes ago"
    /// 5. Free-form `day [de] month [de] year [HH:MM]`
    ///
    /// Anything else resolves to exactly `now`.
    pub fn resolve(&self, raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return now;
        }

        if let Some(instant) = parse_iso(trimmed) {
            return instant;
        }

        let lower = trimmed.to_lowercase();

        if self.locales.iter().any(|l| l.mentions_today(&lower)) {
            return match find_time(&lower) {
                Some(time) => at_time(now.date_naive(), time).unwrap_or(now),
                None => now,
            };
        }

        if self.locales.iter().any(|l| l.mentions_yesterday(&lower)) {
            let Some(yesterday) = now.date_naive().pred_opt() else {
                return now;
            };
            let time = find_time(&lower).unwrap_or(NaiveTime::MIN);
            return at_time(yesterday, time).unwrap_or(now);
        }

        if self.locales.iter().any(|l| l.mentions_minutes_ago(&lower)) {
            return number_regex()
                .find(&lower)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .and_then(|minutes| now.checked_sub_signed(Duration::minutes(i64::from(minutes))))
                .unwrap_or(now);
        }

        match self.parse_free_form(&lower, now) {
            Some(instant) => instant,
            None => {
                tracing::trace!("Unrecognised date {:?}, falling back to now", raw);
                now
            }
        }
    }

    /// Returns true if `text` carries a relative-date marker or a year
    ///
    /// Used to pick a date out of free text when the markup has no dedicated
    /// date element.
    pub fn looks_like_date(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.locales.iter().any(|l| {
            l.mentions_today(&lower) || l.mentions_yesterday(&lower) || l.mentions_minutes_ago(&lower)
        }) || year_regex().is_match(&lower)
    }

    /// Scans `day month year [time]` tokens
    ///
    /// A numeral above 1900 is the year and the first numeral up to 31 is the
    /// day; later small numerals are ignored. Without a month token nothing is
    /// returned.
    fn parse_free_form(&self, lower: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut cleaned = lower.replace(',', " ");
        for locale in &self.locales {
            for connector in locale.connectors {
                cleaned = cleaned.replace(connector, " ");
            }
        }

        let mut day: Option<u32> = None;
        let mut month: Option<u32> = None;
        let mut year: Option<i32> = None;
        let mut time: Option<NaiveTime> = None;

        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        for (i, token) in tokens.iter().enumerate() {
            if let Some(value) = numeral(token) {
                if value > 1900 {
                    year = i32::try_from(value).ok();
                } else if value <= 31 && day.is_none() {
                    day = Some(value);
                }
            } else if self.is_trailing_ago(&tokens, i) {
                continue;
            } else if let Some(m) = self.locales.iter().find_map(|l| l.month(token)) {
                month = Some(m);
            } else if token.contains(':') {
                let with_meridiem = match tokens.get(i + 1) {
                    Some(next) => format!("{} {}", token, next),
                    None => token.to_string(),
                };
                time = find_time(&with_meridiem).or(time);
            }
        }

        let month = month?;
        let year = year.unwrap_or_else(|| now.year());
        // A zero day is treated like a missing one
        let day = day.filter(|d| *d > 0).unwrap_or(1);

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        at_time(date, time.unwrap_or(NaiveTime::MIN))
    }

    /// Returns true if `tokens[i]` is an "ago" marker following a unit word
    ///
    /// "ago" is also a Spanish month abbreviation: in "2 hours ago" it is a
    /// relative marker, in "12 ago 2023" it is August.
    fn is_trailing_ago(&self, tokens: &[&str], i: usize) -> bool {
        let Some(token) = tokens.get(i) else {
            return false;
        };
        if !self.locales.iter().any(|l| l.is_ago_marker(token)) {
            return false;
        }
        match i.checked_sub(1).and_then(|prev| tokens.get(prev)) {
            Some(prev) => numeral(prev).is_none(),
            None => false,
        }
    }
}

/// Resolves with the default Spanish + English locales
pub fn resolve_date(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    static RESOLVER: OnceLock<DateResolver> = OnceLock::new();
    RESOLVER.get_or_init(DateResolver::default).resolve(raw, now)
}

fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // A literal trailing Z without seconds ("2024-01-10T14:30Z")
    let naive_part = raw.strip_suffix('Z').unwrap_or(raw);
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_part, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(naive_part, "%Y-%m-%d")
        .ok()
        .and_then(|date| at_time(date, NaiveTime::MIN))
}

/// Finds the first `HH:MM` / `HH.MM` time, honouring a trailing am/pm
fn find_time(text: &str) -> Option<NaiveTime> {
    let caps = time_regex().captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;

    match caps.get(3).map(|m| m.as_str()) {
        Some("p") if hour < 12 => hour += 12,
        Some("a") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn at_time(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Parses a numeric token, tolerating English ordinal suffixes ("15th")
fn numeral(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.');
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
