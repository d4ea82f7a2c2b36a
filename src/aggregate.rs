//! Per-year and per-decade aggregation over a year-keyed table.
//!
//! Groups are emitted in ascending key order. Rows without a year do not
//! belong to any group.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    data::year_identity,
    error::{ReconcileError, Result},
    frame::{Column, Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearCount {
    pub year: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMean {
    pub column: String,
    pub mean: Option<f64>,
}

/// Means of every numeric column over one group of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: i64,
    pub rows: usize,
    pub means: Vec<ColumnMean>,
}

impl GroupSummary {
    pub fn mean_of(&self, column: &str) -> Option<f64> {
        self.means
            .iter()
            .find(|m| m.column == column)
            .and_then(|m| m.mean)
    }
}

pub fn decade_of(year: f64) -> i64 {
    ((year / 10.0).floor() * 10.0) as i64
}

fn group_rows<F>(table: &Table, key: F) -> Result<BTreeMap<i64, Vec<usize>>>
where
    F: Fn(f64) -> i64,
{
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, year) in table.year_values()?.into_iter().enumerate() {
        if let Some(year) = year {
            groups.entry(key(year)).or_default().push(idx);
        }
    }
    Ok(groups)
}

fn mean_over(values: &[Option<f64>], rows: &[usize]) -> Option<f64> {
    let present = rows.iter().filter_map(|&idx| values[idx]).collect::<Vec<_>>();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Number of non-missing `column` values per year.
pub fn count_by_year(table: &Table, column: &str) -> Result<Vec<YearCount>> {
    let target = table.require_column(column)?;
    let groups = group_rows(table, year_identity)?;
    Ok(groups
        .into_iter()
        .map(|(year, rows)| YearCount {
            year,
            count: rows
                .iter()
                .filter(|&&idx| !target.cells[idx].is_missing())
                .count(),
        })
        .collect())
}

/// Sum of `column` per year; missing and non-numeric cells add nothing.
pub fn sum_by_year(table: &Table, column: &str) -> Result<Vec<YearValue>> {
    let values = table.require_column(column)?.numbers();
    let groups = group_rows(table, year_identity)?;
    Ok(groups
        .into_iter()
        .map(|(year, rows)| YearValue {
            year,
            value: rows
                .iter()
                .filter_map(|&idx| values[idx])
                .fold(0.0, |acc, v| acc + v),
        })
        .collect())
}

fn mean_by<F>(table: &Table, key: F) -> Result<Vec<GroupSummary>>
where
    F: Fn(f64) -> i64,
{
    let numeric = table
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| (c.name.clone(), c.numbers()))
        .collect::<Vec<_>>();
    let groups = group_rows(table, key)?;
    Ok(groups
        .into_iter()
        .map(|(key, rows)| GroupSummary {
            key,
            rows: rows.len(),
            means: numeric
                .iter()
                .map(|(name, values)| ColumnMean {
                    column: name.clone(),
                    mean: mean_over(values, &rows),
                })
                .collect(),
        })
        .collect())
}

/// Mean of every numeric column per year.
pub fn mean_by_year(table: &Table) -> Result<Vec<GroupSummary>> {
    mean_by(table, year_identity)
}

/// Mean of every numeric column per decade (`floor(year / 10) * 10`).
pub fn mean_by_decade(table: &Table) -> Result<Vec<GroupSummary>> {
    mean_by(table, decade_of)
}

/// Lays group summaries out as a table keyed by `key_name`.
pub fn summaries_to_table(
    name: &str,
    key_name: &str,
    summaries: &[GroupSummary],
) -> Result<Table> {
    let mut columns = vec![Column::from_numbers(
        key_name,
        &summaries
            .iter()
            .map(|s| Some(s.key as f64))
            .collect::<Vec<_>>(),
    )];
    if let Some(first) = summaries.first() {
        for (position, mean) in first.means.iter().enumerate() {
            let values = summaries
                .iter()
                .map(|s| s.means.get(position).and_then(|m| m.mean))
                .collect::<Vec<_>>();
            columns.push(Column::from_numbers(mean.column.clone(), &values));
        }
    }
    Table::new(name, columns)
}

/// Mean of the present values of `column`.
pub fn column_mean(table: &Table, column: &str) -> Result<f64> {
    let target = table.require_column(column)?;
    mean_where(target, |_| true)
}

/// Mean over the values of `column` that are strictly positive.
pub fn mean_where_positive(table: &Table, column: &str) -> Result<f64> {
    let target = table.require_column(column)?;
    mean_where(target, |v| v > 0.0)
}

fn mean_where<P>(column: &Column, keep: P) -> Result<f64>
where
    P: Fn(f64) -> bool,
{
    let values = column
        .numbers()
        .into_iter()
        .flatten()
        .filter(|v| keep(*v))
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Err(ReconcileError::EmptyColumn {
            column: column.name.clone(),
        });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decade_of_floors_to_ten_year_bucket() {
        assert_eq!(decade_of(1991.0), 1990);
        assert_eq!(decade_of(2000.0), 2000);
        assert_eq!(decade_of(1999.9), 1990);
    }

    #[test]
    fn mean_where_positive_ignores_zero_rows() {
        let table = Table::new(
            "rain",
            vec![
                Column::from_numbers("year", &[Some(1990.0), Some(1991.0), Some(1992.0)]),
                Column::from_numbers("rainfall_mm", &[Some(0.0), Some(100.0), Some(300.0)]),
            ],
        )
        .unwrap();
        assert_eq!(mean_where_positive(&table, "rainfall_mm").unwrap(), 200.0);
    }

    #[test]
    fn column_mean_fails_on_all_missing_column() {
        let table = Table::new(
            "temps",
            vec![
                Column::from_numbers("year", &[Some(1990.0)]),
                Column::from_numbers("avg_temp_c", &[None]),
            ],
        )
        .unwrap();
        assert_eq!(
            column_mean(&table, "avg_temp_c").unwrap_err(),
            ReconcileError::EmptyColumn {
                column: "avg_temp_c".into()
            }
        );
    }

    #[test]
    fn mean_by_year_averages_repeated_years() {
        let table = Table::new(
            "daily",
            vec![
                Column::from_numbers("year", &[Some(1990.0), Some(1990.0), Some(1991.0)]),
                Column::from_numbers("avg_temp_c", &[Some(24.0), Some(26.0), None]),
            ],
        )
        .unwrap();
        let yearly = mean_by_year(&table).unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].rows, 2);
        assert_eq!(yearly[0].mean_of("avg_temp_c"), Some(25.0));
        assert_eq!(yearly[1].mean_of("avg_temp_c"), None);
    }

    #[test]
    fn sum_by_year_treats_missing_as_zero() {
        let table = Table::new(
            "rain",
            vec![
                Column::from_numbers("year", &[Some(1990.0), Some(1990.0), Some(1991.0)]),
                Column::from_numbers("rainfall_mm", &[Some(5.0), Some(7.5), None]),
            ],
        )
        .unwrap();
        let totals = sum_by_year(&table, "rainfall_mm").unwrap();
        assert_eq!(
            totals,
            vec![
                YearValue {
                    year: 1990,
                    value: 12.5
                },
                YearValue {
                    year: 1991,
                    value: 0.0
                },
            ]
        );
    }
}
