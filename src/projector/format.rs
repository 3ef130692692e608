//! Value coercion and number formatting helpers
//!
//! Records arrive as loosely typed JSON. These helpers read a value as the
//! type a field declares and render numbers the way the dashboard shows them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Separators used when rendering numbers for people
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberStyle {
    pub thousands: Option<char>,
    pub decimal: char,
}

impl Default for NumberStyle {
    fn default() -> Self {
        Self {
            thousands: Some(','),
            decimal: '.',
        }
    }
}

/// Read a value as a number
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace, a
/// leading currency symbol and `,` grouping are ignored).
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Read a value as a calendar date
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and Unix
/// epoch milliseconds.
pub fn value_as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Some(date);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.date());
            }
            s.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

/// Read a value as a boolean
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "si" | "sí" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read a value as display text
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Insert a grouping separator every three digits of an unsigned digit run
pub fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Render a number with a fixed count of decimals
///
/// Non-finite input renders as zero.
pub fn format_fixed(value: f64, decimals: usize, style: NumberStyle) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut out = String::new();
    let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    match style.thousands {
        Some(sep) => out.push_str(&group_thousands(int_part, sep)),
        None => out.push_str(int_part),
    }
    if let Some(frac) = frac_part {
        out.push(style.decimal);
        out.push_str(frac);
    }
    out
}

/// Render a number keeping up to `max_decimals`, trailing zeros removed
pub fn format_trimmed(value: f64, max_decimals: usize, style: NumberStyle) -> String {
    let fixed = format_fixed(value, max_decimals, style);
    if max_decimals == 0 {
        return fixed;
    }
    let trimmed = fixed.trim_end_matches('0');
    trimmed.trim_end_matches(style.decimal).to_string()
}

/// Render a currency amount, e.g. `$1,234.56` or `-$12.00`
pub fn format_currency(value: f64, symbol: &str, style: NumberStyle) -> String {
    let body = format_fixed(value, 2, style);
    match body.strip_prefix('-') {
        Some(abs) => format!("-{symbol}{abs}"),
        None => format!("{symbol}{body}"),
    }
}

/// Render a percentage given in percent units, e.g. `12.50%`
pub fn format_percentage(value: f64, style: NumberStyle) -> String {
    format!("{}%", format_fixed(value, 2, style))
}
