//! FILENAME: core/engine/src/number_format.rs
//! PURPOSE: Number formatting utilities for displaying cell values.
//! CONTEXT: Computed columns with the `number` format carry a numeral-style
//! pattern such as `0,0.[000]`, `0.00%` or `$0,0.00`. This module parses the
//! pattern once and formats values against it.
//!
//! SUPPORTED PATTERN FEATURES:
//! - `,` in the integer part: thousands separators
//! - `.00`: fixed decimals, `.[00]`: optional decimals (trailing zeros trimmed)
//! - `%` anywhere: value multiplied by 100
//! - any other text before/after the digits: literal prefix/suffix
//! - `(` ... `)` around the pattern: negatives shown in parentheses

/// Pattern used when a number column has none configured.
pub const DEFAULT_NUMBER_PATTERN: &str = "0,0.[000]";

/// A parsed numeral-style pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberPattern {
    prefix: String,
    suffix: String,
    thousands: bool,
    min_decimals: usize,
    max_decimals: usize,
    percent: bool,
    parentheses: bool,
}

impl NumberPattern {
    /// Parses a pattern. Unrecognized patterns degrade to the default.
    pub fn parse(pattern: &str) -> Self {
        let mut pattern = pattern.trim();
        if pattern.is_empty() {
            pattern = DEFAULT_NUMBER_PATTERN;
        }

        let parentheses = pattern.starts_with('(') && pattern.ends_with(')');
        let pattern = if parentheses {
            &pattern[1..pattern.len() - 1]
        } else {
            pattern
        };

        let is_core = |c: char| matches!(c, '0' | '#' | ',' | '.' | '[' | ']');
        let start = match pattern.find(|c: char| c == '0' || c == '#') {
            Some(i) => i,
            None => return NumberPattern::parse(DEFAULT_NUMBER_PATTERN),
        };
        let end = pattern[start..]
            .char_indices()
            .find(|(_, c)| !is_core(*c))
            .map(|(i, _)| start + i)
            .unwrap_or(pattern.len());

        let prefix = pattern[..start].to_string();
        let suffix = pattern[end..].to_string();
        let core = &pattern[start..end];

        // `0[.]00` makes the whole decimal part optional
        let optional_dot = core.contains("[.");
        let split = if optional_dot {
            core.split_once("[.")
        } else {
            core.split_once('.')
        };
        let (integer_part, decimal_part) = match split {
            Some((int, dec)) => (int, Some(dec)),
            None => (core, None),
        };

        let mut min_decimals = 0;
        let mut max_decimals = 0;
        if let Some(dec) = decimal_part {
            let mut optional = optional_dot;
            for c in dec.chars() {
                match c {
                    '[' => optional = true,
                    ']' if !optional_dot => optional = false,
                    '0' | '#' => {
                        max_decimals += 1;
                        if !optional {
                            min_decimals += 1;
                        }
                    }
                    _ => {}
                }
            }
        }

        NumberPattern {
            percent: prefix.contains('%') || suffix.contains('%'),
            prefix,
            suffix,
            thousands: integer_part.contains(','),
            min_decimals,
            max_decimals,
            parentheses,
        }
    }

    /// Formats a value against this pattern.
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".to_string();
        }
        if value.is_infinite() {
            return if value > 0.0 { "∞" } else { "-∞" }.to_string();
        }

        let scaled = if self.percent { value * 100.0 } else { value };
        let negative = scaled < 0.0 && format_fixed(scaled.abs(), self.max_decimals) != format_fixed(0.0, self.max_decimals);

        let mut digits = format_fixed(scaled.abs(), self.max_decimals);
        if self.max_decimals > self.min_decimals {
            digits = trim_optional_decimals(&digits, self.min_decimals);
        }
        if self.thousands {
            digits = add_thousands_separator(&digits);
        }

        let body = format!("{}{}{}", self.prefix, digits, self.suffix);
        match (negative, self.parentheses) {
            (true, true) => format!("({})", body),
            (true, false) => format!("-{}", body),
            _ => body,
        }
    }
}

/// Formats a number with a fixed count of decimals.
fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{:.prec$}", value, prec = decimals)
}

/// Strips trailing zeros beyond `min_decimals`, and the dot if nothing is left.
fn trim_optional_decimals(s: &str, min_decimals: usize) -> String {
    let Some((integer, decimals)) = s.split_once('.') else {
        return s.to_string();
    };

    let mut kept = decimals.trim_end_matches('0').to_string();
    while kept.len() < min_decimals {
        kept.push('0');
    }

    if kept.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, kept)
    }
}

/// Add thousands separators to a numeric string.
pub fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    let len = digits.len();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if negative {
        result = format!("-{}", result);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// Format a number in general format (no pattern configured anywhere).
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();

    // For integers, don't show decimal point
    if value.fract() == 0.0 && abs_value < 1e15 {
        return format!("{:.0}", value);
    }

    // For decimals, show up to 10 significant digits but trim trailing zeros
    let formatted = format!("{:.10}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
