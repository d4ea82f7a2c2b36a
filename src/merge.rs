//! Full outer merge of year-keyed tables.
//!
//! Every input must already carry a resolved `year` column. Inputs are joined
//! left to right; the result is sorted ascending by year, holds one row per
//! distinct year, and keeps every non-key column of every source.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    data::{Cell, year_identity},
    error::{ReconcileError, Result},
    frame::{Column, Table, YEAR_COLUMN},
    schema::dedupe_columns,
};

pub const MERGED_TABLE_NAME: &str = "merged";

/// A table split into its integer year keys and non-key columns.
#[derive(Debug, Clone)]
struct Keyed {
    name: String,
    years: Vec<i64>,
    columns: Vec<Column>,
}

impl Keyed {
    fn rows(&self) -> usize {
        self.years.len()
    }

    /// Rows whose year is missing cannot take part in the join and are dropped.
    /// Repeated years keep their first row only, which is the row the final
    /// keep-first deduplication would retain anyway.
    fn from_table(table: &Table) -> Result<Self> {
        let years = table.year_values()?;
        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(years.len());
        let mut keys = Vec::with_capacity(years.len());
        let mut dropped_missing = 0usize;
        for (idx, year) in years.iter().enumerate() {
            match year {
                Some(value) => {
                    let key = year_identity(*value);
                    if seen.insert(key) {
                        keep.push(idx);
                        keys.push(key);
                    }
                }
                None => dropped_missing += 1,
            }
        }
        if dropped_missing > 0 {
            warn!(
                "Dropping {dropped_missing} row(s) without a year from '{}'",
                table.name()
            );
        }
        let duplicates = years.len() - dropped_missing - keep.len();
        if duplicates > 0 {
            debug!(
                "'{}' repeats {duplicates} year(s); keeping the first row of each",
                table.name()
            );
        }
        let trimmed = table.take_rows(&keep);
        let columns = trimmed
            .into_columns()
            .into_iter()
            .filter(|column| column.name != YEAR_COLUMN)
            .collect();
        Ok(Self {
            name: table.name().to_string(),
            years: keys,
            columns,
        })
    }

    fn into_table(self) -> Result<Table> {
        let year = Column::new(
            YEAR_COLUMN,
            self.years.iter().map(|y| Cell::Number(*y as f64)).collect(),
        );
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(year);
        columns.extend(self.columns);
        Table::new(self.name, columns)
    }
}

/// Fails with [`ReconcileError::Merge`] when two inputs share a non-key column.
fn check_collisions(tables: &[Table]) -> Result<()> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    for (position, table) in tables.iter().enumerate() {
        for column in table.columns() {
            if column.name == YEAR_COLUMN {
                continue;
            }
            if let Some(&owner) = owners.get(column.name.as_str())
                && owner != position
            {
                return Err(ReconcileError::Merge {
                    column: column.name.clone(),
                    left: tables[owner].name().to_string(),
                    right: table.name().to_string(),
                });
            }
            owners.insert(column.name.as_str(), position);
        }
    }
    Ok(())
}

fn take_cells(column: &Column, positions: &[Option<usize>]) -> Column {
    let cells = positions
        .iter()
        .map(|pos| pos.map_or(Cell::Missing, |idx| column.cells[idx].clone()))
        .collect();
    Column::new(column.name.clone(), cells)
}

/// Full outer join on the year key. Left rows come first in their original
/// order, followed by unmatched right rows in theirs.
fn outer_join(left: &Keyed, right: &Keyed) -> Keyed {
    let mut lookup: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, year) in right.years.iter().enumerate() {
        lookup.entry(*year).or_default().push(idx);
    }

    let mut matched = vec![false; right.rows()];
    let mut left_positions = Vec::with_capacity(left.rows());
    let mut right_positions = Vec::with_capacity(left.rows());
    let mut years = Vec::with_capacity(left.rows());
    for (l_idx, year) in left.years.iter().enumerate() {
        match lookup.get(year) {
            Some(bucket) => {
                for &r_idx in bucket {
                    matched[r_idx] = true;
                    left_positions.push(Some(l_idx));
                    right_positions.push(Some(r_idx));
                    years.push(*year);
                }
            }
            None => {
                left_positions.push(Some(l_idx));
                right_positions.push(None);
                years.push(*year);
            }
        }
    }
    for (r_idx, was_matched) in matched.iter().enumerate() {
        if !was_matched {
            left_positions.push(None);
            right_positions.push(Some(r_idx));
            years.push(right.years[r_idx]);
        }
    }

    let columns = left
        .columns
        .iter()
        .map(|column| take_cells(column, &left_positions))
        .chain(
            right
                .columns
                .iter()
                .map(|column| take_cells(column, &right_positions)),
        )
        .collect();
    Keyed {
        name: MERGED_TABLE_NAME.to_string(),
        years,
        columns,
    }
}

/// Sorts rows ascending by year (stable) and keeps the first row per year.
fn sort_and_dedupe(keyed: Keyed) -> Keyed {
    let order = (0..keyed.rows())
        .sorted_by_key(|&idx| keyed.years[idx])
        .dedup_by(|a, b| keyed.years[*a] == keyed.years[*b])
        .collect::<Vec<_>>();
    let positions = order.iter().map(|&idx| Some(idx)).collect::<Vec<_>>();
    Keyed {
        name: keyed.name.clone(),
        years: order.iter().map(|&idx| keyed.years[idx]).collect(),
        columns: keyed
            .columns
            .iter()
            .map(|column| take_cells(column, &positions))
            .collect(),
    }
}

/// Merges normalized, year-keyed tables into one record per distinct year.
pub fn merge_tables(tables: &[Table]) -> Result<Table> {
    let Some(first) = tables.first() else {
        return Err(ReconcileError::schema(
            MERGED_TABLE_NAME,
            "at least one source table is required",
        ));
    };
    for table in tables {
        if !table.has_year() {
            return Err(ReconcileError::schema(
                table.name(),
                "no resolved 'year' column to merge on",
            ));
        }
    }
    check_collisions(tables)?;

    let mut merged = Keyed::from_table(first)?;
    for table in &tables[1..] {
        let right = Keyed::from_table(table)?;
        debug!(
            "Joining '{}' ({} row(s)) onto {} row(s)",
            right.name,
            right.rows(),
            merged.rows()
        );
        merged = outer_join(&merged, &right);
    }
    merged.name = MERGED_TABLE_NAME.to_string();
    let merged = sort_and_dedupe(merged).into_table()?;
    // Cross-source clashes were rejected above; this only drops names an
    // input repeated within itself.
    let merged = dedupe_columns(&merged)?;
    info!(
        "Merged {} table(s) into {} row(s) across {} column(s)",
        tables.len(),
        merged.row_count(),
        merged.columns().len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(name: &str, years: &[i64], values: &[f64]) -> Keyed {
        Keyed {
            name: name.into(),
            years: years.to_vec(),
            columns: vec![Column::from_numbers(
                format!("{name}_value"),
                &values.iter().map(|v| Some(*v)).collect::<Vec<_>>(),
            )],
        }
    }

    #[test]
    fn outer_join_keeps_unmatched_rows_from_both_sides() {
        let left = keyed("a", &[1990, 1991], &[1.0, 2.0]);
        let right = keyed("b", &[1991, 1992], &[20.0, 30.0]);
        let joined = outer_join(&left, &right);
        assert_eq!(joined.years, vec![1990, 1991, 1992]);
        assert_eq!(
            joined.columns[0].numbers(),
            vec![Some(1.0), Some(2.0), None]
        );
        assert_eq!(
            joined.columns[1].numbers(),
            vec![None, Some(20.0), Some(30.0)]
        );
    }

    #[test]
    fn sort_and_dedupe_keeps_first_row_per_year() {
        let input = keyed("a", &[1992, 1990, 1992], &[1.0, 2.0, 3.0]);
        let output = sort_and_dedupe(input);
        assert_eq!(output.years, vec![1990, 1992]);
        assert_eq!(output.columns[0].numbers(), vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn merge_drops_columns_repeated_within_one_input() {
        let table = Table::new(
            "rain",
            vec![
                Column::from_numbers(YEAR_COLUMN, &[Some(1990.0), Some(1991.0)]),
                Column::from_numbers("rainfall_mm", &[Some(1.0), Some(2.0)]),
                Column::from_numbers("rainfall_mm", &[Some(9.0), Some(9.0)]),
            ],
        )
        .unwrap();
        let merged = merge_tables(&[table]).unwrap();
        assert_eq!(merged.column_names(), vec!["year", "rainfall_mm"]);
        assert_eq!(
            merged.column("rainfall_mm").unwrap().numbers(),
            vec![Some(1.0), Some(2.0)]
        );
    }
}
