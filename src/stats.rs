//! Descriptive statistics for the numeric columns of a table.

use serde::Serialize;

use crate::{data::format_number, frame::Table};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    fn from_values(name: &str, values: &[Option<f64>]) -> Self {
        let mut present = values.iter().flatten().copied().collect::<Vec<_>>();
        present.sort_by(f64::total_cmp);
        let count = present.len();
        let sum: f64 = present.iter().sum();
        let mean = (count > 0).then(|| sum / count as f64);
        let std_dev = mean.filter(|_| count >= 2).map(|mean| {
            let squares: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count as f64 - 1.0)).sqrt()
        });
        let median = if count == 0 {
            None
        } else if count.is_multiple_of(2) {
            Some((present[count / 2 - 1] + present[count / 2]) / 2.0)
        } else {
            Some(present[count / 2])
        };
        Self {
            name: name.to_string(),
            count,
            missing: values.len() - count,
            mean,
            std_dev,
            min: present.first().copied(),
            median,
            max: present.last().copied(),
        }
    }

    pub fn render_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.count.to_string(),
            self.missing.to_string(),
            format_metric(self.mean),
            format_metric(self.std_dev),
            format_metric(self.min),
            format_metric(self.median),
            format_metric(self.max),
        ]
    }

    pub fn headers() -> Vec<String> {
        ["column", "count", "missing", "mean", "std_dev", "min", "median", "max"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }
}

pub fn format_metric(metric: Option<f64>) -> String {
    match metric {
        Some(value) if value.fract() == 0.0 => format_number(value),
        Some(value) if value.is_finite() => format!("{value:.4}"),
        _ => String::new(),
    }
}

/// Describes every numeric column of `table`, in column order.
pub fn describe(table: &Table) -> Vec<ColumnStats> {
    table
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| ColumnStats::from_values(&c.name, &c.numbers()))
        .collect()
}

/// Missing-cell count for every column, numeric or not.
pub fn missing_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.missing_count()))
        .collect()
}
