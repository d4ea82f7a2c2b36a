//! Year-key resolution.
//!
//! Sources encode the year differently: a clean `year` column, several
//! year-like columns of varying quality, or only a date/time column. The
//! resolver produces exactly one numeric `year` column, placed first, and
//! drops every other year-like column.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    coerce::{CoercionMode, coerce_column},
    data::{Cell, ColumnKind, extract_year},
    error::{ReconcileError, Result},
    frame::{Column, Table, YEAR_COLUMN},
    schema::normalize_column_name,
};

/// How a source table's year key is obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum YearSource {
    /// Pick the best year-like column, falling back to the first temporal column.
    #[default]
    Auto,
    /// Extract the year component of the named date/time column.
    Derive { column: String },
}

/// Indices of columns whose name contains `year`, case-insensitively.
pub fn year_candidates(table: &Table) -> Vec<usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.name.to_lowercase().contains("year"))
        .map(|(idx, _)| idx)
        .collect()
}

/// Resolves the canonical `year` column of `table` according to `source`.
pub fn resolve_year(table: &Table, source: &YearSource) -> Result<Table> {
    let candidates = year_candidates(table);
    let year = match source {
        YearSource::Derive { column } => derive_from_named(table, column)?,
        YearSource::Auto => match select_candidate(table, &candidates) {
            Some(column) => column,
            None => {
                let temporal = table
                    .columns()
                    .iter()
                    .find(|column| column.kind() == ColumnKind::Temporal)
                    .ok_or_else(|| {
                        ReconcileError::schema(
                            table.name(),
                            "no year-like column and no date/time column to derive a year from",
                        )
                    })?;
                debug!(
                    "Table '{}' has no year-like column; deriving from '{}'",
                    table.name(),
                    temporal.name
                );
                derive_year(table.name(), temporal)
            }
        },
    };

    let mut columns = Vec::with_capacity(table.columns().len() + 1);
    columns.push(year);
    columns.extend(
        table
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, _)| !candidates.contains(idx))
            .map(|(_, column)| column.clone()),
    );
    table.with_columns(columns)
}

/// Chooses the candidate with the most parseable values; ties go to the
/// earliest column.
fn select_candidate(table: &Table, candidates: &[usize]) -> Option<Column> {
    let scored = candidates
        .iter()
        .map(|&idx| {
            let coerced = coerce_column(&table.columns()[idx], CoercionMode::Required);
            let parsed = coerced.non_missing_count();
            debug!(
                "Year candidate '{}' in '{}': {} parseable value(s)",
                coerced.name,
                table.name(),
                parsed
            );
            (parsed, coerced)
        })
        .collect::<Vec<_>>();
    // max_by_key keeps the last maximum, so scan from the back.
    scored
        .into_iter()
        .rev()
        .max_by_key(|(parsed, _)| *parsed)
        .map(|(_, column)| column.renamed(YEAR_COLUMN))
}

fn derive_from_named(table: &Table, name: &str) -> Result<Column> {
    let normalized = normalize_column_name(name);
    let column = table.column(&normalized).ok_or_else(|| {
        ReconcileError::schema(
            table.name(),
            format!("date/time column '{normalized}' for year derivation not found"),
        )
    })?;
    Ok(derive_year(table.name(), column))
}

fn derive_year(table: &str, column: &Column) -> Column {
    let cells = column
        .cells
        .iter()
        .map(|cell| match cell {
            Cell::Text(text) => {
                extract_year(text).map_or(Cell::Missing, |y| Cell::Number(f64::from(y)))
            }
            Cell::Number(value) => Cell::Number(*value),
            Cell::Missing => Cell::Missing,
        })
        .collect::<Vec<_>>();
    let derived = Column::new(YEAR_COLUMN, cells);
    let unparsed = derived.missing_count() - column.missing_count();
    if unparsed > 0 {
        warn!(
            "{unparsed} value(s) in '{}' of '{table}' could not be read as dates",
            column.name
        );
    }
    derived
}
