//! Relationship and trend analysis over the merged yearly record.
//!
//! - [`correlation_matrix`]: pairwise Pearson correlation of numeric columns.
//! - [`linear_regression`]: ordinary least squares of one column on another.
//! - [`extremes`]: rows holding a column's maximum and minimum.
//! - [`trend_direction`]: first-versus-last comparison in year order.

use std::{cmp::Ordering, fmt};

use serde::Serialize;

use crate::{
    data::year_identity,
    error::{ReconcileError, Result},
    frame::Table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

fn paired(x: &[Option<f64>], y: &[Option<f64>]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect()
}

/// Centered second moments `(n, mean_x, mean_y, sxx, syy, sxy)` of the pairs.
fn moments(pairs: &[(f64, f64)]) -> (f64, f64, f64, f64, f64, f64) {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    (n, mean_x, mean_y, sxx, syy, sxy)
}

/// Pearson correlation over pairwise-complete observations. NaN when fewer
/// than two pairs exist or either side has zero variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs = paired(x, y);
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let (_, _, _, sxx, syy, sxy) = moments(&pairs);
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Symmetric correlation matrix over every numeric column. The diagonal is 1
/// except for zero-variance columns, whose whole row and column are NaN.
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let numeric = table
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| (c.name.clone(), c.numbers()))
        .collect::<Vec<_>>();
    let size = numeric.len();
    let mut values = vec![vec![f64::NAN; size]; size];
    for i in 0..size {
        let (_, xs) = &numeric[i];
        values[i][i] = if pearson(xs, xs).is_nan() { f64::NAN } else { 1.0 };
        for j in (i + 1)..size {
            let r = pearson(xs, &numeric[j].1);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regression {
    pub x: String,
    pub y: String,
    pub observations: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub r_squared: f64,
    /// Standard error of the slope.
    pub std_err: f64,
    pub intercept_std_err: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares fit of `y` on `x` over rows where both are present.
pub fn linear_regression(table: &Table, x: &str, y: &str) -> Result<Regression> {
    let xs = table.require_column(x)?.numbers();
    let ys = table.require_column(y)?.numbers();
    let pairs = paired(&xs, &ys);
    if pairs.len() < 2 {
        return Err(ReconcileError::InsufficientData {
            x: x.to_string(),
            y: y.to_string(),
            found: pairs.len(),
        });
    }
    let (n, mean_x, mean_y, sxx, syy, sxy) = moments(&pairs);
    if sxx == 0.0 {
        return Err(ReconcileError::ConstantRegressor {
            x: x.to_string(),
            y: y.to_string(),
        });
    }
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let (std_err, intercept_std_err) = if pairs.len() == 2 {
        (0.0, 0.0)
    } else {
        let df = n - 2.0;
        let ssxm = sxx / n;
        let ssym = syy / n;
        let slope_err = ((1.0 - r_value * r_value).max(0.0) * ssym / ssxm / df).sqrt();
        (slope_err, slope_err * (ssxm + mean_x * mean_x).sqrt())
    };
    Ok(Regression {
        x: x.to_string(),
        y: y.to_string(),
        observations: pairs.len(),
        slope,
        intercept,
        r_value,
        r_squared: r_value * r_value,
        std_err,
        intercept_std_err,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremeRow {
    pub row: usize,
    pub year: Option<i64>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extremes {
    pub column: String,
    pub max: ExtremeRow,
    pub min: ExtremeRow,
}

/// Rows with the largest and smallest value of `column`; ties go to the
/// earliest row.
pub fn extremes(table: &Table, column: &str) -> Result<Extremes> {
    let values = table.require_column(column)?.numbers();
    let years = table.year_values().unwrap_or_else(|_| vec![None; values.len()]);
    let mut max: Option<ExtremeRow> = None;
    let mut min: Option<ExtremeRow> = None;
    for (row, value) in values.iter().enumerate() {
        let Some(value) = *value else { continue };
        let candidate = ExtremeRow {
            row,
            year: years[row].map(year_identity),
            value,
        };
        if max.is_none_or(|m| value > m.value) {
            max = Some(candidate);
        }
        if min.is_none_or(|m| value < m.value) {
            min = Some(candidate);
        }
    }
    match (max, min) {
        (Some(max), Some(min)) => Ok(Extremes {
            column: column.to_string(),
            max,
            min,
        }),
        _ => Err(ReconcileError::EmptyColumn {
            column: column.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => f.write_str("increasing"),
            TrendDirection::Decreasing => f.write_str("decreasing"),
        }
    }
}

/// Compares the last value of `column` against the first, rows taken in
/// ascending year order (stable; rows without a year sort last).
///
/// Only a strictly greater last value counts as [`TrendDirection::Increasing`].
/// Equal values, or a missing first or last value, read as
/// [`TrendDirection::Decreasing`].
pub fn trend_direction(table: &Table, column: &str) -> Result<TrendDirection> {
    let values = table.require_column(column)?.numbers();
    if values.is_empty() {
        return Err(ReconcileError::EmptyColumn {
            column: column.to_string(),
        });
    }
    let years = table.year_values()?;
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| match (years[a], years[b]) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    let first = order.first().and_then(|&idx| values[idx]);
    let last = order.last().and_then(|&idx| values[idx]);
    Ok(match (first, last) {
        (Some(first), Some(last)) if last > first => TrendDirection::Increasing,
        _ => TrendDirection::Decreasing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Cell, frame::Column};

    #[test]
    fn pearson_is_nan_for_zero_variance() {
        let x = [Some(1.0), Some(1.0), Some(1.0)];
        let y = [Some(1.0), Some(2.0), Some(3.0)];
        assert!(pearson(&x, &y).is_nan());
    }

    #[test]
    fn pearson_uses_pairwise_complete_rows() {
        let x = [Some(1.0), None, Some(2.0), Some(3.0)];
        let y = [Some(2.0), Some(100.0), Some(4.0), Some(6.0)];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn moments_are_centered() {
        let (n, mx, my, sxx, syy, sxy) = moments(&[(1.0, 2.0), (3.0, 6.0)]);
        assert_eq!((n, mx, my), (2.0, 2.0, 4.0));
        assert_eq!((sxx, syy, sxy), (2.0, 8.0, 4.0));
    }

    fn yearly(years: &[Option<f64>], values: &[Option<f64>]) -> Table {
        Table::new(
            "trend",
            vec![
                Column::from_numbers("year", years),
                Column::from_numbers("value", values),
            ],
        )
        .unwrap()
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_nan_for_constant_columns() {
        let table = Table::new(
            "merged",
            vec![
                Column::from_numbers("rainfall_mm", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
                Column::new("flood_type", vec![Cell::Text("Flash".into()); 4]),
                Column::from_numbers("flood_frequency", &[Some(2.0), Some(1.0), Some(4.0), Some(3.0)]),
                Column::from_numbers("avg_temp_c", &[Some(27.0); 4]),
            ],
        )
        .unwrap();
        let matrix = correlation_matrix(&table);
        assert_eq!(
            matrix.columns,
            vec!["rainfall_mm", "flood_frequency", "avg_temp_c"]
        );
        for i in 0..2 {
            assert_eq!(matrix.values[i][i], 1.0);
        }
        assert_eq!(matrix.values[0][1], matrix.values[1][0]);
        assert!((matrix.values[0][1] - 0.6).abs() < 1e-12);
        for k in 0..3 {
            assert!(matrix.values[2][k].is_nan());
            assert!(matrix.values[k][2].is_nan());
        }
        assert_eq!(matrix.get("flood_frequency", "rainfall_mm"), Some(matrix.values[0][1]));
    }

    #[test]
    fn trend_direction_orders_rows_by_year() {
        // Input order reads 30 -> 20 (decreasing); year order reads 10 -> 30.
        let table = yearly(
            &[Some(2002.0), Some(2000.0), Some(2001.0)],
            &[Some(30.0), Some(10.0), Some(20.0)],
        );
        assert_eq!(
            trend_direction(&table, "value").unwrap(),
            TrendDirection::Increasing
        );
    }

    #[test]
    fn trend_direction_sorts_rows_without_year_last() {
        let table = yearly(
            &[Some(2000.0), None, Some(2001.0)],
            &[Some(10.0), Some(5.0), Some(20.0)],
        );
        assert_eq!(
            trend_direction(&table, "value").unwrap(),
            TrendDirection::Decreasing
        );
    }
}
