//! Per-column imputation of missing numeric values.
//!
//! Two policies coexist and are selected per column:
//!
//! - **mean fill** (`fill_missing_with_mean: true`): missing cells take the
//!   mean of the column's present values. An all-missing column has no mean;
//!   it takes `fallback_value_when_all_missing` if one is set and otherwise
//!   stays missing.
//! - **constant fill** (`fill_missing_with_mean: false`): missing cells take
//!   `fallback_value_when_all_missing`, or stay missing if it is unset.
//!
//! Temperature columns use the first policy with no fallback; rainfall uses
//! the second with a fallback of `0`.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::Cell,
    error::Result,
    frame::{Column, Table},
    schema::normalize_column_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputationPolicy {
    pub fill_missing_with_mean: bool,
    #[serde(default)]
    pub fallback_value_when_all_missing: Option<f64>,
}

impl ImputationPolicy {
    /// Fill with the column mean; leave an all-missing column missing.
    pub fn mean_fill() -> Self {
        Self {
            fill_missing_with_mean: true,
            fallback_value_when_all_missing: None,
        }
    }

    /// Fill every missing cell with `value`.
    pub fn constant_fill(value: f64) -> Self {
        Self {
            fill_missing_with_mean: false,
            fallback_value_when_all_missing: Some(value),
        }
    }

    fn fill_value(&self, mean: Option<f64>) -> Option<f64> {
        if self.fill_missing_with_mean {
            mean.or(self.fallback_value_when_all_missing)
        } else {
            self.fallback_value_when_all_missing
        }
    }
}

/// A policy bound to a column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    pub fill_missing_with_mean: bool,
    #[serde(default)]
    pub fallback_value_when_all_missing: Option<f64>,
}

impl ColumnImputation {
    pub fn new(column: &str, policy: ImputationPolicy) -> Self {
        Self {
            column: column.to_string(),
            fill_missing_with_mean: policy.fill_missing_with_mean,
            fallback_value_when_all_missing: policy.fallback_value_when_all_missing,
        }
    }

    pub fn policy(&self) -> ImputationPolicy {
        ImputationPolicy {
            fill_missing_with_mean: self.fill_missing_with_mean,
            fallback_value_when_all_missing: self.fallback_value_when_all_missing,
        }
    }
}

/// Arithmetic mean of the present numeric values, `None` when there are none.
pub fn present_mean(column: &Column) -> Option<f64> {
    let values = column.numbers().into_iter().flatten().collect::<Vec<_>>();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn impute_column(column: &Column, policy: &ImputationPolicy) -> Column {
    let mean = if policy.fill_missing_with_mean {
        present_mean(column)
    } else {
        None
    };
    let Some(fill) = policy.fill_value(mean) else {
        debug!("Column '{}' has no fill value; leaving gaps", column.name);
        return column.clone();
    };
    let mut filled = 0usize;
    let cells = column
        .cells
        .iter()
        .map(|cell| match cell {
            Cell::Missing => {
                filled += 1;
                Cell::Number(fill)
            }
            other => other.clone(),
        })
        .collect();
    debug!(
        "Filled {filled} missing cell(s) in '{}' with {fill}",
        column.name
    );
    Column::new(column.name.clone(), cells)
}

/// Applies each configured imputation to its column. Columns without a policy
/// pass through unchanged; policies naming absent columns are ignored.
pub fn impute_table(table: &Table, imputations: &[ColumnImputation]) -> Result<Table> {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            imputations
                .iter()
                .find(|rule| normalize_column_name(&rule.column) == column.name)
                .map_or_else(
                    || column.clone(),
                    |rule| impute_column(column, &rule.policy()),
                )
        })
        .collect();
    table.with_columns(columns)
}
