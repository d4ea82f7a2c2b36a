//! In-memory table model shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of named [`Column`]s whose cells are aligned
//! by row index. Stages never mutate a table they were handed; they build and
//! return a new one.

use crate::{
    data::{Cell, ColumnKind, looks_temporal},
    error::{ReconcileError, Result},
};

/// Canonical name of the resolved year key.
pub const YEAR_COLUMN: &str = "year";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn from_numbers(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        let cells = values
            .iter()
            .map(|value| match value {
                Some(v) if !v.is_nan() => Cell::Number(*v),
                _ => Cell::Missing,
            })
            .collect();
        Self::new(name, cells)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.cells.clone())
    }

    /// Numeric view of the column: text and missing cells read as `None`.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(Cell::as_number).collect()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    pub fn non_missing_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Decides the column kind from content. Missing cells do not vote; a
    /// column with no values at all reads as text.
    pub fn kind(&self) -> ColumnKind {
        let mut numbers = 0usize;
        let mut texts = Vec::new();
        for cell in &self.cells {
            match cell {
                Cell::Number(_) => numbers += 1,
                Cell::Text(text) => texts.push(text.as_str()),
                Cell::Missing => {}
            }
        }
        if numbers > 0 && texts.is_empty() {
            ColumnKind::Numeric
        } else if numbers == 0 && !texts.is_empty() && texts.iter().all(|t| looks_temporal(t)) {
            ColumnKind::Temporal
        } else {
            ColumnKind::Text
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        let rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(ragged) = columns.iter().find(|c| c.len() != rows) {
            return Err(ReconcileError::schema(
                &name,
                format!(
                    "column '{}' has {} cell(s) but the table has {} row(s)",
                    ragged.name,
                    ragged.len(),
                    rows
                ),
            ));
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Builds a table from raw text rows. Short rows are padded with missing cells.
    pub fn from_rows(name: impl Into<String>, headers: &[String], rows: &[Vec<String>]) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let cells = rows
                    .iter()
                    .map(|row| row.get(idx).map_or(Cell::Missing, |raw| Cell::from_raw(raw)))
                    .collect();
                Column::new(header.clone(), cells)
            })
            .collect::<Vec<_>>();
        Self {
            name: name.into(),
            rows: rows.len(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| ReconcileError::column_not_found(&self.name, name))
    }

    /// Returns a copy of this table with `columns` in place of the current set.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self> {
        Table::new(self.name.clone(), columns)
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
            rows: self.rows,
        }
    }

    pub fn has_year(&self) -> bool {
        self.column(YEAR_COLUMN).is_some()
    }

    /// Year key values, one per row.
    pub fn year_values(&self) -> Result<Vec<Option<f64>>> {
        self.column(YEAR_COLUMN)
            .map(Column::numbers)
            .ok_or_else(|| {
                ReconcileError::schema(&self.name, "no resolved 'year' column is present")
            })
    }

    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[index]).collect()
    }

    /// Keeps only the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let cells = indices.iter().map(|&i| column.cells[i].clone()).collect();
                Column::new(column.name.clone(), cells)
            })
            .collect();
        Self {
            name: self.name.clone(),
            columns,
            rows: indices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_ragged_columns() {
        let err = Table::new(
            "rain",
            vec![
                Column::from_numbers("year", &[Some(1990.0), Some(1991.0)]),
                Column::from_numbers("total", &[Some(1.0)]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::Schema { .. }));
    }

    #[test]
    fn kind_distinguishes_numeric_temporal_and_text() {
        let numeric = Column::new("a", vec![Cell::Number(1.0), Cell::Missing]);
        let temporal = Column::new(
            "b",
            vec![Cell::Text("1990-01-01".into()), Cell::Text("02-01-1990".into())],
        );
        let text = Column::new("c", vec![Cell::Text("Flash".into()), Cell::Number(2.0)]);
        assert_eq!(numeric.kind(), ColumnKind::Numeric);
        assert_eq!(temporal.kind(), ColumnKind::Temporal);
        assert_eq!(text.kind(), ColumnKind::Text);
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let headers = vec!["year".to_string(), "total".to_string()];
        let rows = vec![vec!["1990".to_string()]];
        let table = Table::from_rows("rain", &headers, &rows);
        assert_eq!(table.row_count(), 1);
        assert!(table.columns()[1].cells[0].is_missing());
    }
}
