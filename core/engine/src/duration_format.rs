//! FILENAME: core/engine/src/duration_format.rs
//! PURPOSE: Duration formatting (humanized or converted to a fixed unit).
//! CONTEXT: A duration column declares the unit its values are expressed in
//! (`durationInputFormat`) and how to present them (`durationOutputFormat`:
//! `humanize` or `asSeconds`, `asHours`, ...). The same unit table backs the
//! `duration()` and `asduration()` formula functions.

use serde::{Deserialize, Serialize};

/// Units a duration value can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Picoseconds,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

const MS_PER_SECOND: f64 = 1_000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;
const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;
const MS_PER_YEAR: f64 = 365.25 * MS_PER_DAY;
const MS_PER_MONTH: f64 = MS_PER_YEAR / 12.0;

impl DurationUnit {
    /// Milliseconds in one unit.
    pub fn millis(self) -> f64 {
        match self {
            DurationUnit::Picoseconds => 1e-9,
            DurationUnit::Nanoseconds => 1e-6,
            DurationUnit::Microseconds => 1e-3,
            DurationUnit::Milliseconds => 1.0,
            DurationUnit::Seconds => MS_PER_SECOND,
            DurationUnit::Minutes => MS_PER_MINUTE,
            DurationUnit::Hours => MS_PER_HOUR,
            DurationUnit::Days => MS_PER_DAY,
            DurationUnit::Weeks => MS_PER_WEEK,
            DurationUnit::Months => MS_PER_MONTH,
            DurationUnit::Years => MS_PER_YEAR,
        }
    }

    /// Parses `seconds`, `second`, `s`, `asSeconds`, ... (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let lower = lower.strip_prefix("as").unwrap_or(&lower);
        let unit = match lower {
            "ps" | "picosecond" | "picoseconds" => DurationUnit::Picoseconds,
            "ns" | "nanosecond" | "nanoseconds" => DurationUnit::Nanoseconds,
            "us" | "microsecond" | "microseconds" => DurationUnit::Microseconds,
            "ms" | "millisecond" | "milliseconds" => DurationUnit::Milliseconds,
            "s" | "second" | "seconds" => DurationUnit::Seconds,
            "m" | "min" | "minute" | "minutes" => DurationUnit::Minutes,
            "h" | "hour" | "hours" => DurationUnit::Hours,
            "d" | "day" | "days" => DurationUnit::Days,
            "w" | "week" | "weeks" => DurationUnit::Weeks,
            "mon" | "month" | "months" => DurationUnit::Months,
            "y" | "year" | "years" => DurationUnit::Years,
            _ => return None,
        };
        Some(unit)
    }

    fn long_suffix(self) -> &'static str {
        match self {
            DurationUnit::Picoseconds => "Picoseconds",
            DurationUnit::Nanoseconds => "Nanoseconds",
            DurationUnit::Microseconds => "Microseconds",
            DurationUnit::Milliseconds => "Milliseconds",
            DurationUnit::Seconds => "Seconds",
            DurationUnit::Minutes => "Minutes",
            DurationUnit::Hours => "Hours",
            DurationUnit::Days => "Days",
            DurationUnit::Weeks => "Weeks",
            DurationUnit::Months => "Months",
            DurationUnit::Years => "Years",
        }
    }

    fn short_suffix(self) -> &'static str {
        match self {
            DurationUnit::Picoseconds => "ps",
            DurationUnit::Nanoseconds => "ns",
            DurationUnit::Microseconds => "µs",
            DurationUnit::Milliseconds => "ms",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "min",
            DurationUnit::Hours => "h",
            DurationUnit::Days => "d",
            DurationUnit::Weeks => "w",
            DurationUnit::Months => "mon",
            DurationUnit::Years => "y",
        }
    }
}

/// Converts `value` expressed in `from` into `to`.
pub fn convert(value: f64, from: DurationUnit, to: DurationUnit) -> f64 {
    value * from.millis() / to.millis()
}

/// The calendar-like component of a duration, e.g. the `5` of `2 days 5 hours`.
pub fn component(value: f64, unit: DurationUnit, component: DurationUnit) -> f64 {
    let millis = (value * unit.millis()).abs();
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let whole = |ms: f64, per: f64| (ms / per).floor();
    let part = match component {
        DurationUnit::Years => whole(millis, MS_PER_YEAR),
        DurationUnit::Months => whole(millis % MS_PER_YEAR, MS_PER_MONTH),
        DurationUnit::Weeks => whole(millis % MS_PER_MONTH, MS_PER_WEEK),
        DurationUnit::Days => whole(millis % MS_PER_MONTH, MS_PER_DAY),
        DurationUnit::Hours => whole(millis % MS_PER_DAY, MS_PER_HOUR),
        DurationUnit::Minutes => whole(millis % MS_PER_HOUR, MS_PER_MINUTE),
        DurationUnit::Seconds => whole(millis % MS_PER_MINUTE, MS_PER_SECOND),
        DurationUnit::Milliseconds => whole(millis % MS_PER_SECOND, 1.0),
        DurationUnit::Microseconds => whole(millis % 1.0, 1e-3),
        DurationUnit::Nanoseconds => whole(millis % 1e-3, 1e-6),
        DurationUnit::Picoseconds => whole(millis % 1e-6, 1e-9),
    };
    sign * part
}

/// Duration column options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DurationFormat {
    pub input_format: DurationUnit,
    /// `humanize` or `as<Unit>`.
    pub output_format: String,
    pub output_precision: usize,
    pub show_suffix: bool,
    pub use_short_suffix: bool,
    pub include_space_with_suffix: bool,
}

impl Default for DurationFormat {
    fn default() -> Self {
        DurationFormat {
            input_format: DurationUnit::Seconds,
            output_format: "humanize".to_string(),
            output_precision: 0,
            show_suffix: false,
            use_short_suffix: false,
            include_space_with_suffix: true,
        }
    }
}

impl DurationFormat {
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        match DurationUnit::parse(&self.output_format) {
            Some(unit) if self.output_format.to_lowercase() != "humanize" => {
                let converted = convert(value, self.input_format, unit);
                let text = format!("{:.prec$}", converted, prec = self.output_precision);
                if !self.show_suffix {
                    return text;
                }
                let suffix = if self.use_short_suffix {
                    unit.short_suffix()
                } else {
                    unit.long_suffix()
                };
                if self.include_space_with_suffix {
                    format!("{} {}", text, suffix)
                } else {
                    format!("{}{}", text, suffix)
                }
            }
            _ => humanize(value * self.input_format.millis()),
        }
    }
}

/// Relative-time text in the style of "a few seconds", "5 minutes", "a year".
pub fn humanize(millis: f64) -> String {
    let seconds = (millis.abs() / MS_PER_SECOND).round();
    let minutes = (seconds / 60.0).round();
    let hours = (minutes / 60.0).round();
    let days = (hours / 24.0).round();
    let months = (millis.abs() / MS_PER_MONTH).round();
    let years = (millis.abs() / MS_PER_YEAR).round();

    if seconds < 45.0 {
        "a few seconds".to_string()
    } else if minutes < 2.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if hours < 2.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if days < 2.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days)
    } else if months < 2.0 {
        "a month".to_string()
    } else if months < 11.0 {
        format!("{} months", months)
    } else if years < 2.0 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parsing() {
        assert_eq!(DurationUnit::parse("asHours"), Some(DurationUnit::Hours));
        assert_eq!(DurationUnit::parse("ms"), Some(DurationUnit::Milliseconds));
        assert_eq!(DurationUnit::parse("Minutes"), Some(DurationUnit::Minutes));
        assert_eq!(DurationUnit::parse("fortnights"), None);
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(90.0, DurationUnit::Minutes, DurationUnit::Hours), 1.5);
        assert_eq!(convert(2.0, DurationUnit::Seconds, DurationUnit::Milliseconds), 2000.0);
    }

    #[test]
    fn test_component() {
        // 1 day, 2 hours, 3 minutes, 4 seconds
        let secs = 86_400.0 + 2.0 * 3600.0 + 3.0 * 60.0 + 4.0;
        assert_eq!(component(secs, DurationUnit::Seconds, DurationUnit::Days), 1.0);
        assert_eq!(component(secs, DurationUnit::Seconds, DurationUnit::Hours), 2.0);
        assert_eq!(component(secs, DurationUnit::Seconds, DurationUnit::Minutes), 3.0);
        assert_eq!(component(secs, DurationUnit::Seconds, DurationUnit::Seconds), 4.0);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize(10_000.0), "a few seconds");
        assert_eq!(humanize(5.0 * MS_PER_MINUTE), "5 minutes");
        assert_eq!(humanize(3.0 * MS_PER_HOUR), "3 hours");
        assert_eq!(humanize(3.0 * MS_PER_DAY), "3 days");
        assert_eq!(humanize(3.0 * MS_PER_YEAR), "3 years");
    }

    #[test]
    fn test_fixed_unit_output_with_suffix() {
        let format = DurationFormat {
            input_format: DurationUnit::Seconds,
            output_format: "asMinutes".to_string(),
            output_precision: 1,
            show_suffix: true,
            use_short_suffix: true,
            include_space_with_suffix: false,
        };
        assert_eq!(format.format(90.0), "1.5min");

        let long = DurationFormat {
            use_short_suffix: false,
            include_space_with_suffix: true,
            ..format
        };
        assert_eq!(long.format(90.0), "1.5 Minutes");
    }

    #[test]
    fn test_default_is_humanized_seconds() {
        assert_eq!(DurationFormat::default().format(7200.0), "2 hours");
    }
}
