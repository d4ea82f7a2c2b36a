//! Paired series handed to an external chart renderer.
//!
//! Every series holds equally long `x` and `y` vectors with no missing
//! markers: a point is emitted only when both coordinates are present.

use serde::Serialize;

use crate::{
    aggregate::GroupSummary,
    error::Result,
    frame::{Table, YEAR_COLUMN},
    trend::Regression,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ChartSeries {
    pub fn from_pairs(label: &str, xs: &[Option<f64>], ys: &[Option<f64>]) -> Self {
        let (x, y) = xs
            .iter()
            .zip(ys)
            .filter_map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                _ => None,
            })
            .unzip();
        Self {
            label: label.to_string(),
            x,
            y,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Column roles the chart builder looks for.
#[derive(Debug, Clone, Copy)]
pub struct ChartColumns<'a> {
    pub rainfall: &'a str,
    pub avg_temp: &'a str,
    pub flood_frequency: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartBundle {
    /// Rainfall and average temperature against year.
    pub trend: Vec<ChartSeries>,
    pub flood_frequency: Option<ChartSeries>,
    /// Decadal means of rainfall, temperature, and flood frequency.
    pub decadal: Vec<ChartSeries>,
    pub rainfall_vs_floods: Option<ChartSeries>,
    pub fit_line: Option<ChartSeries>,
}

fn year_series(table: &Table, column: &str) -> Result<Option<ChartSeries>> {
    let Some(target) = table.column(column) else {
        return Ok(None);
    };
    let years = table.year_values()?;
    Ok(Some(ChartSeries::from_pairs(column, &years, &target.numbers())))
}

/// Builds every chart series the data supports. Roles whose column is absent
/// are skipped.
pub fn build_charts(
    table: &Table,
    decades: &[GroupSummary],
    regression: Option<&Regression>,
    roles: ChartColumns<'_>,
) -> Result<ChartBundle> {
    let mut bundle = ChartBundle::default();
    for column in [roles.rainfall, roles.avg_temp] {
        if let Some(series) = year_series(table, column)? {
            bundle.trend.push(series);
        }
    }
    bundle.flood_frequency = year_series(table, roles.flood_frequency)?;

    let decade_keys = decades
        .iter()
        .map(|d| Some(d.key as f64))
        .collect::<Vec<_>>();
    for column in [roles.rainfall, roles.avg_temp, roles.flood_frequency] {
        if column == YEAR_COLUMN || table.column(column).is_none() {
            continue;
        }
        let means = decades.iter().map(|d| d.mean_of(column)).collect::<Vec<_>>();
        bundle
            .decadal
            .push(ChartSeries::from_pairs(column, &decade_keys, &means));
    }

    if let (Some(rain), Some(floods)) = (
        table.column(roles.rainfall),
        table.column(roles.flood_frequency),
    ) {
        let scatter = ChartSeries::from_pairs(
            &format!("{} vs {}", roles.rainfall, roles.flood_frequency),
            &rain.numbers(),
            &floods.numbers(),
        );
        if let Some(fit) = regression {
            let fitted = scatter.x.iter().map(|x| Some(fit.predict(*x))).collect::<Vec<_>>();
            let xs = scatter.x.iter().map(|x| Some(*x)).collect::<Vec<_>>();
            bundle.fit_line = Some(ChartSeries::from_pairs("fit", &xs, &fitted));
        }
        bundle.rainfall_vs_floods = Some(scatter);
    }
    Ok(bundle)
}
