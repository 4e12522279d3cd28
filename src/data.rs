use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serializer;

/// A single spreadsheet cell after loading. Dates and booleans are carried
/// as text since the extractor only ever needs labels and numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
        }
    }

    /// Trimmed, non-empty display text.
    pub fn label(&self) -> Option<String> {
        let display = self.as_display();
        let trimmed = display.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => n.is_finite().then_some(*n),
            Cell::Text(s) => parse_numeric(s),
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => {
                let valid = n.fract() == 0.0 && (1000.0..=9999.0).contains(n);
                valid.then_some(*n as i32)
            }
            Cell::Text(s) => parse_year_prefix(s),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Parses a numeric cell. Placeholders such as `:` or `-`, blanks and
/// malformed text are absent rather than zero.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() == 1 && trimmed.chars().all(|c| c.is_ascii_punctuation()) {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Extracts the year from labels such as `2021` or `2021 (provisional)`.
pub fn parse_year_prefix(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.get(4).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    trimmed[..4].parse().ok()
}

/// Strips currency symbols, thousands separators and whitespace from a price.
pub fn clean_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rounds to two decimals for display. Computation always uses the raw value.
pub fn round2(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

pub fn serialize_rounded<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round2(*value))
}

pub fn serialize_rounded_opt<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&round2(*v)),
        None => serializer.serialize_none(),
    }
}
