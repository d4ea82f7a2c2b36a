use std::{fmt, sync::OnceLock};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single resolved cell. The kind is an explicit tag, never inferred from
/// an ambient runtime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    Missing,
    Text(String),
}

impl Cell {
    /// Builds a cell from raw CSV text. Empty cells and placeholder tokens
    /// become [`Cell::Missing`]; everything else is kept verbatim as text.
    pub fn from_raw(raw: &str) -> Self {
        if is_missing_token(raw) {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Number(value) => format_number(*value),
            Cell::Missing => String::new(),
            Cell::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Semantic kind of a column, decided from its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Text => "text",
        };
        f.write_str(label)
    }
}

/// Outcome of attempting to read a numeric value out of free-form text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericParse {
    Number(f64),
    Missing,
    Invalid,
}

pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "na" | "n/a" | "n.a." | "nan" | "null" | "none" | "missing"
    ) || lowered.chars().all(|c| c == '-')
}

/// Parses `raw` as a number after stripping surrounding whitespace and
/// thousands separators. Non-finite results are rejected.
pub fn parse_number(raw: &str) -> NumericParse {
    if is_missing_token(raw) {
        return NumericParse::Missing;
    }
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => NumericParse::Number(value),
        Ok(value) if value.is_nan() => NumericParse::Missing,
        _ => NumericParse::Invalid,
    }
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y",
    ];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%d-%m-%Y %H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

fn bare_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}$").expect("static year pattern compiles"))
}

/// Extracts the calendar year from a date, datetime, or bare four-digit year.
pub fn extract_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if bare_year_pattern().is_match(trimmed) {
        return trimmed.parse().ok();
    }
    parse_naive_datetime(trimmed)
        .map(|dt| dt.year())
        .or_else(|| parse_naive_date(trimmed).map(|d| d.year()))
}

pub fn looks_temporal(raw: &str) -> bool {
    let trimmed = raw.trim();
    parse_naive_datetime(trimmed).is_some() || parse_naive_date(trimmed).is_some()
}

/// Renders integral values without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Integer identity of a real-valued year, used for grouping and display.
pub fn year_identity(year: f64) -> i64 {
    year.floor() as i64
}
