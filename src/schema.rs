//! Schema normalization and column projection.
//!
//! Column names from different sources disagree on case and spacing
//! (`Flood Type`, ` YEAR `, `flood_type`). Everything downstream addresses
//! columns by their canonical form produced here.

use std::{collections::HashSet, sync::OnceLock};

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ReconcileError, Result},
    frame::{Column, Table},
};

fn whitespace_run() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern compiles"))
}

/// Lower-cases, trims, and collapses each internal whitespace run to `_`.
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    whitespace_run().replace_all(&lowered, "_").into_owned()
}

/// Returns a copy of `table` with canonical column names, order preserved.
pub fn normalize_table(table: &Table) -> Result<Table> {
    let columns = table
        .columns()
        .iter()
        .map(|column| column.renamed(normalize_column_name(&column.name)))
        .collect();
    table.with_columns(columns)
}

/// Drops later columns whose name repeats an earlier one.
pub fn dedupe_columns(table: &Table) -> Result<Table> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        if seen.insert(column.name.clone()) {
            columns.push(column.clone());
        } else {
            debug!(
                "Dropping duplicate column '{}' from '{}'",
                column.name,
                table.name()
            );
        }
    }
    table.with_columns(columns)
}

/// One projected column: `from` in the source, optionally renamed to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ColumnSelection {
    pub fn keep(name: &str) -> Self {
        Self {
            from: name.to_string(),
            to: None,
        }
    }

    pub fn rename(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: Some(to.to_string()),
        }
    }

    pub fn output_name(&self) -> &str {
        self.to.as_deref().unwrap_or(&self.from)
    }
}

/// Projects `table` onto `selections` in the listed order. Selection names are
/// normalized before lookup. An empty selection keeps every column.
pub fn select_columns(table: &Table, selections: &[ColumnSelection]) -> Result<Table> {
    if selections.is_empty() {
        return Ok(table.clone());
    }
    let mut columns = Vec::with_capacity(selections.len());
    let mut outputs = HashSet::new();
    for selection in selections {
        let source = normalize_column_name(&selection.from);
        let column = table
            .column(&source)
            .ok_or_else(|| ReconcileError::column_not_found(table.name(), &source))?;
        let target = normalize_column_name(selection.output_name());
        if !outputs.insert(target.clone()) {
            return Err(ReconcileError::schema(
                table.name(),
                format!("projection produces column '{target}' more than once"),
            ));
        }
        columns.push(Column::new(target, column.cells.clone()));
    }
    table.with_columns(columns)
}
