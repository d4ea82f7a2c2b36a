mod common;

use std::collections::HashSet;

use common::{assert_close, numbers};
use proptest::prelude::*;
use weather_reconcile::{
    aggregate::mean_by_decade,
    coerce::{CoercionMode, coerce_column},
    data::{Cell, year_identity},
    error::ReconcileError,
    frame::{Column, Table},
    impute::{ImputationPolicy, impute_column, present_mean},
    merge::merge_tables,
    schema::{normalize_column_name, normalize_table},
    trend::{TrendDirection, extremes, linear_regression, trend_direction},
};

fn yearly(name: &str, years: &[f64], column: &str, values: &[Option<f64>]) -> Table {
    let years = years.iter().map(|y| Some(*y)).collect::<Vec<_>>();
    Table::new(
        name,
        vec![
            Column::from_numbers("year", &years),
            Column::from_numbers(column, values),
        ],
    )
    .unwrap()
}

fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx).is_multiple_of(3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[test]
fn normalizing_normalized_table_changes_nothing() {
    let table = common::raw_table(
        "rain",
        &["  Flood Type", "YEAR", "Avg Temp\tC"],
        &[&["Flash", "1990", "27"]],
    );
    let once = normalize_table(&table).unwrap();
    let twice = normalize_table(&once).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.column_names(), vec!["flood_type", "year", "avg_temp_c"]);
}

#[test]
fn thousands_separated_text_coerces_to_number() {
    let column = Column::new("rainfall_mm", vec![Cell::from_raw("1,234.5")]);
    let coerced = coerce_column(&column, CoercionMode::Required);
    assert_eq!(coerced.cells, vec![Cell::Number(1234.5)]);
}

#[test]
fn mean_fill_leaves_no_gaps_and_keeps_the_mean() {
    let column = Column::from_numbers("avg_temp_c", &[Some(25.5), None, Some(27.0), None]);
    let before = present_mean(&column).unwrap();
    let filled = impute_column(&column, &ImputationPolicy::mean_fill());
    assert_eq!(filled.missing_count(), 0);
    assert_close(present_mean(&filled).unwrap(), before);
}

#[test]
fn merged_years_are_unique_and_every_source_year_survives() {
    let rain = yearly(
        "rain",
        &[1990.0, 1991.0, 1991.0],
        "rainfall_mm",
        &[Some(100.0), Some(200.0), Some(999.0)],
    );
    let temps = yearly(
        "temps",
        &[1991.0, 1992.0],
        "avg_temp_c",
        &[Some(26.0), Some(27.0)],
    );
    let merged = merge_tables(&[rain, temps]).unwrap();

    let years = numbers(&merged, "year")
        .into_iter()
        .map(|y| year_identity(y.unwrap()))
        .collect::<Vec<_>>();
    assert_eq!(years, vec![1990, 1991, 1992]);
    assert_eq!(years.iter().collect::<HashSet<_>>().len(), years.len());
    assert_eq!(
        numbers(&merged, "rainfall_mm"),
        vec![Some(100.0), Some(200.0), None]
    );
    assert_eq!(
        numbers(&merged, "avg_temp_c"),
        vec![None, Some(26.0), Some(27.0)]
    );
}

#[test]
fn merging_tables_that_share_a_data_column_is_rejected() {
    let a = yearly("monthly", &[1990.0], "rainfall_mm", &[Some(1.0)]);
    let b = yearly("daily", &[1990.0], "rainfall_mm", &[Some(2.0)]);
    let err = merge_tables(&[a, b]).unwrap_err();
    assert!(matches!(err, ReconcileError::Merge { ref column, .. } if column == "rainfall_mm"));
}

#[test]
fn decadal_means_group_by_floor_of_year() {
    let table = yearly(
        "floods",
        &[1991.0, 1995.0, 1999.0, 2001.0],
        "value",
        &[Some(10.0), Some(20.0), Some(30.0), Some(40.0)],
    );
    let decades = mean_by_decade(&table).unwrap();
    let summary = decades
        .iter()
        .map(|d| (d.key, d.mean_of("value")))
        .collect::<Vec<_>>();
    assert_eq!(summary, vec![(1990, Some(20.0)), (2000, Some(40.0))]);
}

#[test]
fn regression_on_exact_line_is_deterministic() {
    let table = Table::new(
        "fit",
        vec![
            Column::from_numbers("x", &[Some(1.0), Some(2.0), Some(3.0)]),
            Column::from_numbers("y", &[Some(2.0), Some(4.0), Some(6.0)]),
        ],
    )
    .unwrap();
    let fit = linear_regression(&table, "x", "y").unwrap();
    assert_close(fit.slope, 2.0);
    assert_close(fit.intercept, 0.0);
    assert_close(fit.r_value, 1.0);
    assert_eq!(fit.observations, 3);
}

#[test]
fn regression_needs_two_paired_observations() {
    let table = Table::new(
        "fit",
        vec![
            Column::from_numbers("x", &[Some(1.0), None]),
            Column::from_numbers("y", &[Some(2.0), Some(4.0)]),
        ],
    )
    .unwrap();
    let err = linear_regression(&table, "x", "y").unwrap_err();
    assert!(matches!(err, ReconcileError::InsufficientData { found: 1, .. }));
}

#[test]
fn extremes_tie_goes_to_earliest_row() {
    let table = yearly(
        "temps",
        &[2000.0, 2001.0, 2002.0],
        "value",
        &[Some(5.0), Some(5.0), Some(3.0)],
    );
    let found = extremes(&table, "value").unwrap();
    assert_eq!(found.max.year, Some(2000));
    assert_eq!(found.min.year, Some(2002));
}

#[test]
fn equal_first_and_last_values_are_decreasing() {
    let table = yearly(
        "rain",
        &[2000.0, 2001.0, 2002.0],
        "value",
        &[Some(10.0), Some(30.0), Some(10.0)],
    );
    assert_eq!(
        trend_direction(&table, "value").unwrap(),
        TrendDirection::Decreasing
    );
}

proptest! {
    #[test]
    fn normalizer_is_idempotent(name in "[ A-Za-z0-9_:\t]{0,24}") {
        let once = normalize_column_name(&name);
        prop_assert_eq!(normalize_column_name(&once), once);
    }

    #[test]
    fn thousands_separators_never_change_the_value(whole in 0u64..1_000_000_000, frac in 0u32..100) {
        let text = format!("{}.{frac:02}", with_thousands(whole));
        let expected = format!("{whole}.{frac:02}").parse::<f64>().unwrap();
        let column = Column::new("rainfall_mm", vec![Cell::from_raw(&text)]);
        let coerced = coerce_column(&column, CoercionMode::Required);
        prop_assert_eq!(coerced.cells, vec![Cell::Number(expected)]);
    }

    #[test]
    fn mean_fill_preserves_the_mean(
        values in prop::collection::vec(prop::option::of(-50.0f64..50.0), 1..40)
    ) {
        let column = Column::from_numbers("avg_temp_c", &values);
        prop_assume!(present_mean(&column).is_some());
        let before = present_mean(&column).unwrap();
        let filled = impute_column(&column, &ImputationPolicy::mean_fill());
        prop_assert_eq!(filled.missing_count(), 0);
        prop_assert!((present_mean(&filled).unwrap() - before).abs() < 1e-9);
    }
}
