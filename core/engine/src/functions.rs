//! FILENAME: core/engine/src/functions.rs
//! PURPOSE: Built-in function library for computed column formulas.
//! CONTEXT: The evaluator handles the functions that need lazy argument
//! evaluation or table access (IF, AND, OR, ROWVAL) itself. Everything else
//! lives here as a pure function over already-evaluated arguments.
//!
//! CATEGORIES:
//! - Math: ABS, ROUND, FLOOR, CEIL, SQRT, POW, MOD, INT, SIGN, MIN, MAX, SUM, AVG, COUNT
//! - Logic: NOT, ISNULL, ISNUMBER, ISTEXT, COALESCE
//! - Text: LEN, UPPER, LOWER, TRIM, CONCAT, LEFT, RIGHT, MID, REPT, REPLACE, CONTAINS, JOIN
//! - Percentage: PERCENT, PERCENTCHANGE
//! - Hashing/colour: HASH, COLOR
//! - Regex: REGEX, REGEXTEST
//! - Date: YEAR, MONTH, DAY, HOUR, MINUTE, SECOND, WEEKDAY, DATEFORMAT
//! - Duration: DURATION, ASDURATION

use std::cell::RefCell;

use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::cell::CellValue;
use crate::date_format::{from_epoch_millis, parse_date_text, DatePattern};
use crate::duration_format::{self, DurationUnit};
use crate::error::FormulaError;

/// Functions evaluated by the evaluator itself.
pub const LAZY_FUNCTIONS: &[&str] = &["IF", "AND", "OR", "ROWVAL"];

const EAGER_FUNCTIONS: &[&str] = &[
    "ABS", "ROUND", "FLOOR", "CEIL", "CEILING", "SQRT", "POW", "POWER", "MOD", "INT", "SIGN",
    "MIN", "MAX", "SUM", "AVG", "AVERAGE", "COUNT", "NOT", "ISNULL", "ISNUMBER", "ISTEXT",
    "COALESCE", "LEN", "UPPER", "LOWER", "TRIM", "CONCAT", "LEFT", "RIGHT", "MID", "REPT",
    "REPLACE", "CONTAINS", "JOIN", "PERCENT", "PERCENTCHANGE", "HASH", "COLOR", "REGEX",
    "REGEXTEST", "YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND", "WEEKDAY", "DATEFORMAT",
    "DURATION", "ASDURATION",
];

/// Whether `name` (upper-cased) is a known function.
pub fn is_known(name: &str) -> bool {
    LAZY_FUNCTIONS.contains(&name) || EAGER_FUNCTIONS.contains(&name)
}

type FnResult = Result<CellValue, FormulaError>;

/// Calls an eager built-in with evaluated arguments.
pub fn call(name: &str, args: &[CellValue]) -> FnResult {
    match name {
        // Math
        "ABS" => unary_math(name, args, f64::abs),
        "ROUND" => fn_round(name, args),
        "FLOOR" => fn_floor_ceil(name, args, f64::floor),
        "CEIL" | "CEILING" => fn_floor_ceil(name, args, f64::ceil),
        "SQRT" => fn_sqrt(name, args),
        "POW" | "POWER" => fn_pow(name, args),
        "MOD" => fn_mod(name, args),
        "INT" => unary_math(name, args, f64::trunc),
        "SIGN" => unary_math(name, args, |n| {
            if n > 0.0 {
                1.0
            } else if n < 0.0 {
                -1.0
            } else {
                0.0
            }
        }),
        "MIN" => fn_extreme(name, args, f64::min),
        "MAX" => fn_extreme(name, args, f64::max),
        "SUM" => Ok(CellValue::Number(numbers(args).sum())),
        "AVG" | "AVERAGE" => fn_avg(args),
        "COUNT" => Ok(CellValue::Number(
            args.iter().filter(|v| !v.is_null()).count() as f64,
        )),

        // Logic
        "NOT" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Boolean(!args[0].is_truthy()))
        }
        "ISNULL" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Boolean(args[0].is_null()))
        }
        "ISNUMBER" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Boolean(matches!(args[0], CellValue::Number(_))))
        }
        "ISTEXT" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Boolean(matches!(args[0], CellValue::Text(_))))
        }
        "COALESCE" => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(CellValue::Null)),

        // Text
        "LEN" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Number(args[0].as_text().chars().count() as f64))
        }
        "UPPER" => unary_text(name, args, |s| s.to_uppercase()),
        "LOWER" => unary_text(name, args, |s| s.to_lowercase()),
        "TRIM" => unary_text(name, args, |s| {
            s.split_whitespace().collect::<Vec<&str>>().join(" ")
        }),
        "CONCAT" => Ok(CellValue::Text(
            args.iter().map(CellValue::as_text).collect::<String>(),
        )),
        "LEFT" => fn_left_right(name, args, true),
        "RIGHT" => fn_left_right(name, args, false),
        "MID" => fn_mid(name, args),
        "REPT" => fn_rept(name, args),
        "REPLACE" => {
            arity(name, args, 3, 3)?;
            let text = args[0].as_text();
            let search = args[1].as_text();
            if search.is_empty() {
                return Ok(CellValue::Text(text));
            }
            Ok(CellValue::Text(text.replace(&search, &args[2].as_text())))
        }
        "CONTAINS" => {
            arity(name, args, 2, 2)?;
            Ok(CellValue::Boolean(
                args[0].as_text().contains(&args[1].as_text()),
            ))
        }
        "JOIN" => fn_join(name, args),

        // Percentage
        "PERCENT" => fn_percent(name, args),
        "PERCENTCHANGE" => fn_percent_change(name, args),

        // Hashing / colour
        "HASH" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Number(string_hash(&args[0].as_text()) as f64))
        }
        "COLOR" => {
            arity(name, args, 1, 1)?;
            Ok(CellValue::Text(string_color(&args[0].as_text())))
        }

        // Regex
        "REGEX" => fn_regex(name, args),
        "REGEXTEST" => {
            arity(name, args, 2, 2)?;
            let re = cached_regex(&args[1].as_text())?;
            Ok(CellValue::Boolean(re.is_match(&args[0].as_text())))
        }

        // Date
        "YEAR" => date_part(name, args, |d| d.year() as f64),
        "MONTH" => date_part(name, args, |d| d.month() as f64),
        "DAY" => date_part(name, args, |d| d.day() as f64),
        "HOUR" => date_part(name, args, |d| d.hour() as f64),
        "MINUTE" => date_part(name, args, |d| d.minute() as f64),
        "SECOND" => date_part(name, args, |d| d.second() as f64),
        "WEEKDAY" => date_part(name, args, |d| d.weekday().number_from_monday() as f64),
        "DATEFORMAT" => {
            arity(name, args, 2, 2)?;
            let date = to_date(name, &args[0])?;
            Ok(CellValue::Text(
                DatePattern::parse(&args[1].as_text()).format(&date),
            ))
        }

        // Duration
        "DURATION" => {
            arity(name, args, 3, 3)?;
            let value = number_arg(name, &args[0])?;
            let unit = unit_arg(name, &args[1])?;
            let part = unit_arg(name, &args[2])?;
            Ok(CellValue::Number(duration_format::component(value, unit, part)))
        }
        "ASDURATION" => {
            arity(name, args, 3, 3)?;
            let value = number_arg(name, &args[0])?;
            let from = unit_arg(name, &args[1])?;
            let to = unit_arg(name, &args[2])?;
            Ok(CellValue::Number(duration_format::convert(value, from, to)))
        }

        _ => Err(FormulaError::UnknownFunction(name.to_lowercase())),
    }
}

// ==================== Argument helpers ====================

fn arity(name: &str, args: &[CellValue], min: usize, max: usize) -> Result<(), FormulaError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(FormulaError::function(
            name,
            format!("expected {} argument(s), got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn number_arg(name: &str, value: &CellValue) -> Result<f64, FormulaError> {
    match value {
        CellValue::Null => Ok(0.0),
        other => other.as_number().ok_or_else(|| {
            FormulaError::function(name, format!("'{}' is not a number", other.as_text()))
        }),
    }
}

fn unit_arg(name: &str, value: &CellValue) -> Result<DurationUnit, FormulaError> {
    let text = value.as_text();
    DurationUnit::parse(&text)
        .ok_or_else(|| FormulaError::function(name, format!("unknown duration unit '{}'", text)))
}

/// Numeric arguments, skipping nulls and non-numeric values.
fn numbers(args: &[CellValue]) -> impl Iterator<Item = f64> + '_ {
    args.iter().filter_map(|v| match v {
        CellValue::Null => None,
        other => other.as_number(),
    })
}

// ==================== Math ====================

fn unary_math(name: &str, args: &[CellValue], f: impl Fn(f64) -> f64) -> FnResult {
    arity(name, args, 1, 1)?;
    Ok(CellValue::Number(f(number_arg(name, &args[0])?)))
}

fn fn_round(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 1, 2)?;
    let num = number_arg(name, &args[0])?;
    let digits = match args.get(1) {
        Some(d) => number_arg(name, d)? as i32,
        None => 0,
    };
    let multiplier = 10_f64.powi(digits);
    Ok(CellValue::Number((num * multiplier).round() / multiplier))
}

fn fn_floor_ceil(name: &str, args: &[CellValue], f: impl Fn(f64) -> f64) -> FnResult {
    arity(name, args, 1, 2)?;
    let num = number_arg(name, &args[0])?;
    let significance = match args.get(1) {
        Some(s) => number_arg(name, s)?,
        None => 1.0,
    };
    if significance == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    Ok(CellValue::Number(f(num / significance) * significance))
}

fn fn_sqrt(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 1, 1)?;
    let num = number_arg(name, &args[0])?;
    if num < 0.0 {
        return Err(FormulaError::function(name, "negative argument"));
    }
    Ok(CellValue::Number(num.sqrt()))
}

fn fn_pow(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 2)?;
    let result = number_arg(name, &args[0])?.powf(number_arg(name, &args[1])?);
    if result.is_nan() || result.is_infinite() {
        return Err(FormulaError::function(name, "result is not a finite number"));
    }
    Ok(CellValue::Number(result))
}

fn fn_mod(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 2)?;
    let num = number_arg(name, &args[0])?;
    let divisor = number_arg(name, &args[1])?;
    if divisor == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    // Result has the same sign as the divisor
    Ok(CellValue::Number(num - divisor * (num / divisor).floor()))
}

fn fn_extreme(name: &str, args: &[CellValue], pick: fn(f64, f64) -> f64) -> FnResult {
    if args.is_empty() {
        return Err(FormulaError::function(name, "expected at least 1 argument"));
    }
    Ok(numbers(args)
        .reduce(pick)
        .map(CellValue::Number)
        .unwrap_or(CellValue::Null))
}

fn fn_avg(args: &[CellValue]) -> FnResult {
    let values: Vec<f64> = numbers(args).collect();
    if values.is_empty() {
        return Ok(CellValue::Null);
    }
    Ok(CellValue::Number(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

// ==================== Text ====================

fn unary_text(name: &str, args: &[CellValue], f: impl Fn(&str) -> String) -> FnResult {
    arity(name, args, 1, 1)?;
    Ok(CellValue::Text(f(&args[0].as_text())))
}

/// Longest text REPT may build, in bytes.
const MAX_TEXT_LEN: usize = 1 << 20;

/// A whole-number argument of at least `min`. NaN and infinities are rejected.
fn whole_arg(name: &str, value: &CellValue, min: f64, message: &str) -> Result<usize, FormulaError> {
    let n = number_arg(name, value)?;
    if !n.is_finite() || n < min {
        return Err(FormulaError::function(name, message));
    }
    Ok(n as usize)
}

fn count_arg(name: &str, value: Option<&CellValue>, default: usize) -> Result<usize, FormulaError> {
    match value {
        None => Ok(default),
        Some(v) => whole_arg(name, v, 0.0, "count must be a non-negative number"),
    }
}

fn fn_left_right(name: &str, args: &[CellValue], left: bool) -> FnResult {
    arity(name, args, 1, 2)?;
    let text = args[0].as_text();
    let count = count_arg(name, args.get(1), 1)?;
    let result: String = if left {
        text.chars().take(count).collect()
    } else {
        let skip = text.chars().count().saturating_sub(count);
        text.chars().skip(skip).collect()
    };
    Ok(CellValue::Text(result))
}

fn fn_mid(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 3, 3)?;
    let text = args[0].as_text();
    let start = whole_arg(name, &args[1], 1.0, "start must be at least 1")?;
    let count = count_arg(name, args.get(2), 0)?;
    let result: String = text.chars().skip(start - 1).take(count).collect();
    Ok(CellValue::Text(result))
}

fn fn_rept(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 2)?;
    let text = args[0].as_text();
    let count = count_arg(name, args.get(1), 0)?;
    match text.len().checked_mul(count) {
        Some(len) if len <= MAX_TEXT_LEN => Ok(CellValue::Text(text.repeat(count))),
        _ => Err(FormulaError::function(
            name,
            format!("result would exceed {} bytes", MAX_TEXT_LEN),
        )),
    }
}

/// JOIN(separator, values...): joins the non-null values.
fn fn_join(name: &str, args: &[CellValue]) -> FnResult {
    if args.is_empty() {
        return Err(FormulaError::function(name, "expected a separator"));
    }
    let separator = args[0].as_text();
    let parts: Vec<String> = args[1..]
        .iter()
        .filter(|v| !v.is_null())
        .map(CellValue::as_text)
        .collect();
    Ok(CellValue::Text(parts.join(&separator)))
}

// ==================== Percentage ====================

fn fn_percent(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 3)?;
    let part = number_arg(name, &args[0])?;
    let whole = number_arg(name, &args[1])?;
    if whole == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    let percent = part / whole * 100.0;
    match args.get(2) {
        Some(d) => {
            let multiplier = 10_f64.powi(number_arg(name, d)? as i32);
            Ok(CellValue::Number((percent * multiplier).round() / multiplier))
        }
        None => Ok(CellValue::Number(percent)),
    }
}

fn fn_percent_change(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 2)?;
    let old = number_arg(name, &args[0])?;
    let new = number_arg(name, &args[1])?;
    if old == 0.0 {
        return Err(FormulaError::DivisionByZero);
    }
    Ok(CellValue::Number((new - old) / old.abs() * 100.0))
}

// ==================== Hashing / colour ====================

/// 32-bit string hash over UTF-16 code units (`h * 31 + c`, wrapping).
pub fn string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32))
}

/// Stable `#rrggbb` colour derived from the string hash.
pub fn string_color(text: &str) -> String {
    let hash = string_hash(text);
    let mut color = String::from("#");
    for i in 0..3 {
        let component = (hash >> (i * 8)) & 0xFF;
        color.push_str(&format!("{:02x}", component));
    }
    color
}

// ==================== Regex ====================

thread_local! {
    static REGEX_CACHE: RefCell<FxHashMap<String, Regex>> = RefCell::new(FxHashMap::default());
}

fn cached_regex(pattern: &str) -> Result<Regex, FormulaError> {
    REGEX_CACHE.with(|cache| {
        if let Some(re) = cache.borrow().get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern).map_err(|e| FormulaError::Regex(e.to_string()))?;
        cache.borrow_mut().insert(pattern.to_string(), re.clone());
        Ok(re)
    })
}

/// REGEX(text, pattern[, group]): the given capture group of the first match.
/// Without a group, returns the first capture group if the pattern has one,
/// otherwise the whole match. No match yields null.
fn fn_regex(name: &str, args: &[CellValue]) -> FnResult {
    arity(name, args, 2, 3)?;
    let text = args[0].as_text();
    let re = cached_regex(&args[1].as_text())?;
    let group = match args.get(2) {
        Some(g) => whole_arg(name, g, 0.0, "group must be a non-negative number")?,
        None => usize::from(re.captures_len() > 1),
    };
    let Some(captures) = re.captures(&text) else {
        return Ok(CellValue::Null);
    };
    Ok(captures
        .get(group)
        .map(|m| CellValue::Text(m.as_str().to_string()))
        .unwrap_or(CellValue::Null))
}

// ==================== Date ====================

fn to_date(name: &str, value: &CellValue) -> Result<DateTime<Utc>, FormulaError> {
    let date = match value {
        CellValue::Number(ms) => from_epoch_millis(*ms),
        CellValue::Text(s) => parse_date_text(s),
        _ => None,
    };
    date.ok_or_else(|| FormulaError::function(name, format!("'{}' is not a date", value.as_text())))
}

fn date_part(name: &str, args: &[CellValue], f: impl Fn(&DateTime<Utc>) -> f64) -> FnResult {
    arity(name, args, 1, 1)?;
    if args[0].is_null() {
        return Ok(CellValue::Null);
    }
    Ok(CellValue::Number(f(&to_date(name, &args[0])?)))
}
