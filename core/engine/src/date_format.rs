//! FILENAME: core/engine/src/date_format.rs
//! PURPOSE: Moment-style date pattern formatting.
//! CONTEXT: Date columns carry patterns such as `YYYY-MM-DD HH:mm` or the
//! default `MMMM Do YYYY, HH:mm:ss.SSS`. Values arrive as epoch
//! milliseconds or ISO-8601 strings; everything is rendered in UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

pub const DEFAULT_DATE_PATTERN: &str = "MMMM Do YYYY, HH:mm:ss.SSS";

/// A single piece of a parsed date pattern.
#[derive(Debug, Clone, PartialEq)]
enum DateToken {
    Literal(String),
    Year4,
    Year2,
    MonthName,
    MonthShort,
    Month2,
    Month,
    DayOrdinal,
    Day2,
    Day,
    WeekdayName,
    WeekdayShort,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    Minute2,
    Minute,
    Second2,
    Second,
    Millis,
    MeridiemUpper,
    MeridiemLower,
    Offset,
    UnixSeconds,
    UnixMillis,
}

// Longest tokens first so `MMMM` wins over `MM`.
const TOKENS: &[(&str, DateToken)] = &[
    ("YYYY", DateToken::Year4),
    ("YY", DateToken::Year2),
    ("MMMM", DateToken::MonthName),
    ("MMM", DateToken::MonthShort),
    ("MM", DateToken::Month2),
    ("M", DateToken::Month),
    ("Do", DateToken::DayOrdinal),
    ("DD", DateToken::Day2),
    ("D", DateToken::Day),
    ("dddd", DateToken::WeekdayName),
    ("ddd", DateToken::WeekdayShort),
    ("HH", DateToken::Hour24Padded),
    ("H", DateToken::Hour24),
    ("hh", DateToken::Hour12Padded),
    ("h", DateToken::Hour12),
    ("mm", DateToken::Minute2),
    ("m", DateToken::Minute),
    ("ss", DateToken::Second2),
    ("s", DateToken::Second),
    ("SSS", DateToken::Millis),
    ("A", DateToken::MeridiemUpper),
    ("a", DateToken::MeridiemLower),
    ("Z", DateToken::Offset),
    ("X", DateToken::UnixSeconds),
    ("x", DateToken::UnixMillis),
];

/// A parsed moment-style pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct DatePattern {
    tokens: Vec<DateToken>,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = if pattern.trim().is_empty() {
            DEFAULT_DATE_PATTERN
        } else {
            pattern
        };

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        'outer: while !rest.is_empty() {
            // [escaped text]
            if let Some(stripped) = rest.strip_prefix('[') {
                if let Some(end) = stripped.find(']') {
                    literal.push_str(&stripped[..end]);
                    rest = &stripped[end + 1..];
                    continue;
                }
            }

            for (text, token) in TOKENS {
                if let Some(stripped) = rest.strip_prefix(text) {
                    if !literal.is_empty() {
                        tokens.push(DateToken::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token.clone());
                    rest = stripped;
                    continue 'outer;
                }
            }

            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                literal.push(c);
            }
            rest = chars.as_str();
        }

        if !literal.is_empty() {
            tokens.push(DateToken::Literal(literal));
        }

        DatePattern { tokens }
    }

    pub fn format(&self, date: &DateTime<Utc>) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                DateToken::Literal(s) => out.push_str(s),
                DateToken::Year4 => out.push_str(&format!("{:04}", date.year())),
                DateToken::Year2 => out.push_str(&format!("{:02}", date.year().rem_euclid(100))),
                DateToken::MonthName => out.push_str(&date.format("%B").to_string()),
                DateToken::MonthShort => out.push_str(&date.format("%b").to_string()),
                DateToken::Month2 => out.push_str(&format!("{:02}", date.month())),
                DateToken::Month => out.push_str(&date.month().to_string()),
                DateToken::DayOrdinal => out.push_str(&ordinal(date.day())),
                DateToken::Day2 => out.push_str(&format!("{:02}", date.day())),
                DateToken::Day => out.push_str(&date.day().to_string()),
                DateToken::WeekdayName => out.push_str(&date.format("%A").to_string()),
                DateToken::WeekdayShort => out.push_str(&date.format("%a").to_string()),
                DateToken::Hour24Padded => out.push_str(&format!("{:02}", date.hour())),
                DateToken::Hour24 => out.push_str(&date.hour().to_string()),
                DateToken::Hour12Padded => out.push_str(&format!("{:02}", hour12(date.hour()))),
                DateToken::Hour12 => out.push_str(&hour12(date.hour()).to_string()),
                DateToken::Minute2 => out.push_str(&format!("{:02}", date.minute())),
                DateToken::Minute => out.push_str(&date.minute().to_string()),
                DateToken::Second2 => out.push_str(&format!("{:02}", date.second())),
                DateToken::Second => out.push_str(&date.second().to_string()),
                DateToken::Millis => {
                    out.push_str(&format!("{:03}", date.timestamp_subsec_millis()))
                }
                DateToken::MeridiemUpper => {
                    out.push_str(if date.hour() < 12 { "AM" } else { "PM" })
                }
                DateToken::MeridiemLower => {
                    out.push_str(if date.hour() < 12 { "am" } else { "pm" })
                }
                DateToken::Offset => out.push_str("+00:00"),
                DateToken::UnixSeconds => out.push_str(&date.timestamp().to_string()),
                DateToken::UnixMillis => out.push_str(&date.timestamp_millis().to_string()),
            }
        }
        out
    }
}

fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", day, suffix)
}

/// Interprets epoch milliseconds as a UTC timestamp.
pub fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
}

/// Parses an ISO-8601 / RFC 3339 string, a naive datetime or a plain date.
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DateTime<Utc> {
        // 2021-03-04T15:06:07.089Z
        from_epoch_millis(1_614_870_367_089.0).unwrap()
    }

    #[test]
    fn test_default_pattern() {
        let p = DatePattern::parse("");
        assert_eq!(p.format(&sample()), "March 4th 2021, 15:06:07.089");
    }

    #[test]
    fn test_numeric_pattern() {
        let p = DatePattern::parse("YYYY-MM-DD HH:mm:ss");
        assert_eq!(p.format(&sample()), "2021-03-04 15:06:07");
        let p = DatePattern::parse("D/M/YY h:mm A");
        assert_eq!(p.format(&sample()), "4/3/21 3:06 PM");
    }

    #[test]
    fn test_escaped_literals() {
        let p = DatePattern::parse("[Week of] ddd, MMM D");
        assert_eq!(p.format(&sample()), "Week of Thu, Mar 4");
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn test_parse_date_text() {
        let expected = sample();
        assert_eq!(parse_date_text("2021-03-04T15:06:07.089Z"), Some(expected));
        assert!(parse_date_text("2021-03-04").is_some());
        assert!(parse_date_text("not a date").is_none());
    }
}
