//! Error taxonomy for the reconciliation core.
//!
//! Cell-level parse failures never surface here: they are absorbed into the
//! data model as [`Cell::Missing`](crate::data::Cell::Missing). Everything in
//! this enum aborts the stage that raised it and names the offending table or
//! column so the command layer can attach file context.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// No resolvable year key, or a structural problem with a source table's columns.
    #[error("Schema error in table '{table}': {detail}")]
    Schema { table: String, detail: String },

    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Two merge inputs contribute a non-key column with the same name.
    #[error(
        "Column '{column}' is provided by both '{left}' and '{right}'; rename one of them before merging"
    )]
    Merge {
        column: String,
        left: String,
        right: String,
    },

    #[error("Regression of '{y}' on '{x}' needs at least 2 paired observations, found {found}")]
    InsufficientData { x: String, y: String, found: usize },

    #[error("Regression of '{y}' on '{x}' is undefined: every '{x}' value is identical")]
    ConstantRegressor { x: String, y: String },

    #[error("Column '{column}' has no non-missing values")]
    EmptyColumn { column: String },
}

impl ReconcileError {
    pub(crate) fn schema(table: &str, detail: impl Into<String>) -> Self {
        ReconcileError::Schema {
            table: table.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn column_not_found(table: &str, column: &str) -> Self {
        ReconcileError::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
