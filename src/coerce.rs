//! Numeric coercion of free-form text columns.
//!
//! Coercion is a two-pass process: every cell is first tagged with the result
//! of a parse attempt, then the column-level decision is made from the tally.
//! Malformed cells never raise; they become missing when the column converts.

use log::{debug, warn};

use crate::{
    data::{Cell, NumericParse, parse_number},
    error::Result,
    frame::{Column, Table},
    schema::normalize_column_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionMode {
    /// The column is declared numeric: unparseable cells become missing.
    Required,
    /// Convert only when parsed cells outnumber unparseable ones.
    Infer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionTally {
    pub parsed: usize,
    pub missing: usize,
    pub invalid: usize,
}

impl CoercionTally {
    fn converts_under(&self, mode: CoercionMode) -> bool {
        match mode {
            CoercionMode::Required => true,
            CoercionMode::Infer => self.parsed > 0 && self.parsed > self.invalid,
        }
    }
}

fn tag_cell(cell: &Cell) -> NumericParse {
    match cell {
        Cell::Number(value) => NumericParse::Number(*value),
        Cell::Missing => NumericParse::Missing,
        Cell::Text(text) => parse_number(text),
    }
}

/// First pass: parse every cell without deciding anything yet.
pub fn tally(column: &Column) -> (Vec<NumericParse>, CoercionTally) {
    let mut counts = CoercionTally::default();
    let tags = column
        .cells
        .iter()
        .map(|cell| {
            let tag = tag_cell(cell);
            match tag {
                NumericParse::Number(_) => counts.parsed += 1,
                NumericParse::Missing => counts.missing += 1,
                NumericParse::Invalid => counts.invalid += 1,
            }
            tag
        })
        .collect();
    (tags, counts)
}

/// Coerces a single column. Returns the column untouched when `mode` decides
/// against conversion.
pub fn coerce_column(column: &Column, mode: CoercionMode) -> Column {
    let (tags, counts) = tally(column);
    if !counts.converts_under(mode) {
        debug!(
            "Leaving column '{}' as text ({} parsed, {} unparseable)",
            column.name, counts.parsed, counts.invalid
        );
        return column.clone();
    }
    if counts.parsed == 0 && counts.invalid > 0 {
        warn!(
            "Column '{}' is declared numeric but none of its {} value(s) parse",
            column.name, counts.invalid
        );
    } else if counts.invalid > 0 {
        debug!(
            "Column '{}': {} unparseable cell(s) coerced to missing",
            column.name, counts.invalid
        );
    }
    let cells = tags
        .into_iter()
        .map(|tag| match tag {
            NumericParse::Number(value) => Cell::Number(value),
            NumericParse::Missing | NumericParse::Invalid => Cell::Missing,
        })
        .collect();
    Column::new(column.name.clone(), cells)
}

fn coerce_with(
    table: &Table,
    declared_numeric: &[String],
    undeclared: Option<CoercionMode>,
) -> Result<Table> {
    let declared = declared_numeric
        .iter()
        .map(|name| normalize_column_name(name))
        .collect::<Vec<_>>();
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let mode = if declared.contains(&column.name) {
                Some(CoercionMode::Required)
            } else {
                undeclared
            };
            mode.map_or_else(|| column.clone(), |mode| coerce_column(column, mode))
        })
        .collect();
    table.with_columns(columns)
}

/// Coerces every column of `table`: columns named in `declared_numeric` use
/// [`CoercionMode::Required`], the rest [`CoercionMode::Infer`].
pub fn coerce_table(table: &Table, declared_numeric: &[String]) -> Result<Table> {
    coerce_with(table, declared_numeric, Some(CoercionMode::Infer))
}

/// Coerces only the columns named in `declared_numeric`. Every other column
/// keeps its cells exactly as read.
pub fn coerce_declared(table: &Table, declared_numeric: &[String]) -> Result<Table> {
    coerce_with(table, declared_numeric, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_column(name: &str, raw: &[&str]) -> Column {
        Column::new(name, raw.iter().map(|r| Cell::from_raw(r)).collect())
    }

    #[test]
    fn required_mode_turns_garbage_into_missing() {
        let column = text_column("rainfall_mm", &["1,234.5", "trace", ""]);
        let coerced = coerce_column(&column, CoercionMode::Required);
        assert_eq!(
            coerced.cells,
            vec![Cell::Number(1234.5), Cell::Missing, Cell::Missing]
        );
    }

    #[test]
    fn infer_mode_skips_categorical_columns() {
        let column = text_column("flood_type", &["Flash", "Riverine", "Coastal"]);
        let coerced = coerce_column(&column, CoercionMode::Infer);
        assert_eq!(coerced, column);
    }

    #[test]
    fn infer_mode_converts_mostly_numeric_columns() {
        let column = text_column("tavg", &["27.1", "28", "n/a", "err"]);
        let coerced = coerce_column(&column, CoercionMode::Infer);
        assert_eq!(
            coerced.cells,
            vec![
                Cell::Number(27.1),
                Cell::Number(28.0),
                Cell::Missing,
                Cell::Missing
            ]
        );
    }

    #[test]
    fn infer_mode_keeps_text_when_parse_failures_dominate() {
        let column = text_column("station", &["A1", "B2", "3"]);
        assert_eq!(coerce_column(&column, CoercionMode::Infer), column);
    }

    #[test]
    fn tally_counts_every_outcome() {
        let column = text_column("x", &["1", "", "abc", "2"]);
        let (_, counts) = tally(&column);
        assert_eq!(
            counts,
            CoercionTally {
                parsed: 2,
                missing: 1,
                invalid: 1
            }
        );
    }

    #[test]
    fn coerce_declared_leaves_undeclared_columns_as_read() {
        let table = Table::new(
            "merged",
            vec![
                text_column("station_code", &["101", "102", "X9"]),
                text_column("rainfall_mm", &["1,200", "trace", "3"]),
            ],
        )
        .unwrap();
        let coerced = coerce_declared(&table, &["Rainfall MM".to_string()]).unwrap();
        assert_eq!(coerced.columns()[0], table.columns()[0]);
        assert_eq!(
            coerced.columns()[1].cells,
            vec![Cell::Number(1200.0), Cell::Missing, Cell::Number(3.0)]
        );
    }

    #[test]
    fn coerce_table_infers_undeclared_columns() {
        let table = Table::new("src", vec![text_column("tavg", &["27", "28", "x"])]).unwrap();
        let coerced = coerce_table(&table, &[]).unwrap();
        assert_eq!(coerced.columns()[0].cells[2], Cell::Missing);
    }
}
