//! Structured results handed to the reporting sink, plus their console
//! rendering.
//!
//! Sections whose role column is absent from the table are skipped. A role
//! column that is present but has no usable values is an error.

use std::fmt::Write as _;

use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{
        GroupSummary, YearCount, YearValue, column_mean, count_by_year, mean_by_decade,
        mean_where_positive, sum_by_year, summaries_to_table,
    },
    config::AnalysisConfig,
    data::format_number,
    error::{ReconcileError, Result},
    frame::Table,
    stats::{ColumnStats, describe, format_metric, missing_counts},
    table::render_table,
    trend::{
        CorrelationMatrix, Extremes, Regression, TrendDirection, correlation_matrix, extremes,
        linear_regression, trend_direction,
    },
};

fn when_present<T, F>(table: &Table, column: &str, compute: F) -> Result<Option<T>>
where
    F: FnOnce() -> Result<T>,
{
    if table.column(column).is_none() {
        debug!("Column '{column}' not present; skipping its section");
        return Ok(None);
    }
    compute().map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningSummary {
    /// Mean rainfall over rows with rainfall above zero.
    pub average_rainfall: Option<f64>,
    pub avg_temp_mean: Option<f64>,
    pub max_temp_mean: Option<f64>,
    pub min_temp_mean: Option<f64>,
    pub flood_counts: Option<Vec<YearCount>>,
    pub rainfall_totals: Option<Vec<YearValue>>,
}

pub fn summarize_cleaning(table: &Table, roles: &AnalysisConfig) -> Result<CleaningSummary> {
    let average_rainfall = when_present(table, &roles.rainfall, || {
        match mean_where_positive(table, &roles.rainfall) {
            Ok(mean) => Ok(Some(mean)),
            Err(ReconcileError::EmptyColumn { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    })?
    .flatten();
    Ok(CleaningSummary {
        average_rainfall,
        avg_temp_mean: when_present(table, &roles.avg_temp, || {
            column_mean(table, &roles.avg_temp)
        })?,
        max_temp_mean: when_present(table, &roles.max_temp, || {
            column_mean(table, &roles.max_temp)
        })?,
        min_temp_mean: when_present(table, &roles.min_temp, || {
            column_mean(table, &roles.min_temp)
        })?,
        flood_counts: when_present(table, &roles.flood_type, || {
            count_by_year(table, &roles.flood_type)
        })?,
        rainfall_totals: when_present(table, &roles.rainfall, || {
            sum_by_year(table, &roles.rainfall)
        })?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    pub rainfall: Option<TrendDirection>,
    pub temperature: Option<TrendDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub describe: Vec<ColumnStats>,
    pub missing: Vec<(String, usize)>,
    pub correlation: CorrelationMatrix,
    pub decades: Vec<GroupSummary>,
    pub rainfall_extremes: Option<Extremes>,
    pub temperature_extremes: Option<Extremes>,
    pub regression: Option<Regression>,
    pub trends: Trends,
}

/// Runs every analysis over a year-resolved, coerced table.
pub fn analyze(table: &Table, roles: &AnalysisConfig) -> Result<AnalysisReport> {
    let regression = if table.column(&roles.rainfall).is_some() {
        when_present(table, &roles.flood_frequency, || {
            linear_regression(table, &roles.rainfall, &roles.flood_frequency)
        })?
    } else {
        None
    };
    Ok(AnalysisReport {
        rows: table.row_count(),
        columns: table.column_names(),
        describe: describe(table),
        missing: missing_counts(table),
        correlation: correlation_matrix(table),
        decades: mean_by_decade(table)?,
        rainfall_extremes: when_present(table, &roles.rainfall, || {
            extremes(table, &roles.rainfall)
        })?,
        temperature_extremes: when_present(table, &roles.avg_temp, || {
            extremes(table, &roles.avg_temp)
        })?,
        regression,
        trends: Trends {
            rainfall: when_present(table, &roles.rainfall, || {
                trend_direction(table, &roles.rainfall)
            })?,
            temperature: when_present(table, &roles.avg_temp, || {
                trend_direction(table, &roles.avg_temp)
            })?,
        },
    })
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn render_year_series<T, F>(title: &str, label: &str, series: &[T], value: F) -> String
where
    F: Fn(&T) -> (i64, String),
{
    let rows = series
        .iter()
        .map(|item| {
            let (year, text) = value(item);
            vec![year.to_string(), text]
        })
        .collect::<Vec<_>>();
    format!("\n{title}\n{}", render_table(&strings(&["year", label]), &rows))
}

pub fn render_cleaning_summary(summary: &CleaningSummary, roles: &AnalysisConfig) -> String {
    let mut out = String::new();
    let lines = [
        ("Average rainfall (mm, rows > 0)", summary.average_rainfall),
        ("Average temperature (°C)", summary.avg_temp_mean),
        ("Average max temperature (°C)", summary.max_temp_mean),
        ("Average min temperature (°C)", summary.min_temp_mean),
    ];
    for (label, value) in lines {
        let _ = writeln!(out, "{label}: {}", value.map_or("n/a".into(), format_mean));
    }
    if let Some(counts) = &summary.flood_counts {
        out.push_str(&render_year_series(
            "Flood counts per year",
            &roles.flood_type,
            counts,
            |c| (c.year, c.count.to_string()),
        ));
    }
    if let Some(totals) = &summary.rainfall_totals {
        out.push_str(&render_year_series(
            "Total rainfall per year (mm)",
            &roles.rainfall,
            totals,
            |t| (t.year, format_number(t.value)),
        ));
    }
    out
}

fn format_mean(value: f64) -> String {
    format!("{value:.4}")
}

fn format_correlation(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.3}")
    }
}

fn render_extremes(out: &mut String, label: &str, unit: &str, found: &Extremes) {
    let year = |y: Option<i64>| y.map_or("?".to_string(), |y| y.to_string());
    let _ = writeln!(
        out,
        "Highest {label} year: {} ({} {unit})",
        year(found.max.year),
        format_number(found.max.value)
    );
    let _ = writeln!(
        out,
        "Lowest {label} year: {} ({} {unit})",
        year(found.min.year),
        format_number(found.min.value)
    );
}

pub fn render_analysis(report: &AnalysisReport) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Dataset: {} row(s) x {} column(s)\nColumns: {}",
        report.rows,
        report.columns.len(),
        report.columns.join(", ")
    );

    let _ = writeln!(out, "\nOverview");
    let rows = report
        .describe
        .iter()
        .map(ColumnStats::render_row)
        .collect::<Vec<_>>();
    out.push_str(&render_table(&ColumnStats::headers(), &rows));

    let _ = writeln!(out, "\nMissing values");
    let rows = report
        .missing
        .iter()
        .map(|(name, count)| vec![name.clone(), count.to_string()])
        .collect::<Vec<_>>();
    out.push_str(&render_table(&strings(&["column", "missing"]), &rows));

    let _ = writeln!(out, "\nCorrelation matrix");
    let mut headers = vec![String::new()];
    headers.extend(report.correlation.columns.iter().cloned());
    let rows = report
        .correlation
        .columns
        .iter()
        .zip(&report.correlation.values)
        .map(|(name, values)| {
            std::iter::once(name.clone())
                .chain(values.iter().map(|v| format_correlation(*v)))
                .collect()
        })
        .collect::<Vec<Vec<String>>>();
    out.push_str(&render_table(&headers, &rows));

    let _ = writeln!(out, "\nDecadal summary");
    let decades = summaries_to_table("decades", "decade", &report.decades)?;
    let headers = decades.column_names();
    let rows = (0..decades.row_count())
        .map(|idx| {
            decades
                .row(idx)
                .iter()
                .map(|cell| format_metric(cell.as_number()))
                .collect()
        })
        .collect::<Vec<Vec<String>>>();
    out.push_str(&render_table(&headers, &rows));

    out.push('\n');
    if let Some(found) = &report.rainfall_extremes {
        render_extremes(&mut out, "rainfall", "mm", found);
    }
    if let Some(found) = &report.temperature_extremes {
        render_extremes(&mut out, "avg temp", "°C", found);
    }

    if let Some(fit) = &report.regression {
        let _ = writeln!(
            out,
            "\nRegression of {} on {} ({} observation(s))",
            fit.y, fit.x, fit.observations
        );
        let _ = writeln!(out, "  slope: {:.4}", fit.slope);
        let _ = writeln!(out, "  intercept: {:.4}", fit.intercept);
        let _ = writeln!(out, "  correlation: {:.3}", fit.r_value);
        let _ = writeln!(out, "  r-squared: {:.3}", fit.r_squared);
        let _ = writeln!(out, "  std error: {:.4}", fit.std_err);
    }

    let _ = writeln!(out, "\nTrends");
    if let Some(direction) = report.trends.rainfall {
        let _ = writeln!(out, "  rainfall: {direction}");
    }
    if let Some(direction) = report.trends.temperature {
        let _ = writeln!(out, "  temperature: {direction}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn table(columns: Vec<Column>) -> Table {
        Table::new("cleaned", columns).unwrap()
    }

    #[test]
    fn cleaning_summary_skips_absent_roles() {
        let data = table(vec![
            Column::from_numbers("year", &[Some(1990.0), Some(1991.0)]),
            Column::from_numbers("rainfall_mm", &[Some(0.0), Some(0.0)]),
        ]);
        let summary = summarize_cleaning(&data, &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.average_rainfall, None);
        assert_eq!(summary.avg_temp_mean, None);
        assert!(summary.flood_counts.is_none());
        assert_eq!(summary.rainfall_totals.map(|t| t.len()), Some(2));
    }

    #[test]
    fn present_but_empty_role_column_is_an_error() {
        let data = table(vec![
            Column::from_numbers("year", &[Some(1990.0)]),
            Column::from_numbers("avg_temp_c", &[None]),
        ]);
        assert_eq!(
            summarize_cleaning(&data, &AnalysisConfig::default()).unwrap_err(),
            ReconcileError::EmptyColumn {
                column: "avg_temp_c".into()
            }
        );
    }

    #[test]
    fn render_analysis_prints_nan_correlations() {
        let data = table(vec![
            Column::from_numbers("year", &[Some(2000.0), Some(2001.0)]),
            Column::from_numbers("rainfall_mm", &[Some(5.0), Some(5.0)]),
        ]);
        let report = analyze(&data, &AnalysisConfig::default()).unwrap();
        let rendered = render_analysis(&report).unwrap();
        assert!(rendered.contains("NaN"));
        assert!(rendered.contains("rainfall: decreasing"));
    }
}
