//! YAML run configuration.
//!
//! A configuration lists the source files to combine and how to resolve each
//! one's year key, the cleaning policies, and the column roles the analysis
//! report looks for. Every section has defaults matching the Mumbai
//! rainfall/temperature/flood datasets, so `clean` and `analyze` can run
//! without a file.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    impute::{ColumnImputation, ImputationPolicy},
    schema::ColumnSelection,
    year_key::YearSource,
};

pub const RAINFALL_COLUMN: &str = "rainfall_mm";
pub const AVG_TEMP_COLUMN: &str = "avg_temp_c";
pub const MAX_TEMP_COLUMN: &str = "max_temp_c";
pub const MIN_TEMP_COLUMN: &str = "min_temp_c";
pub const FLOOD_TYPE_COLUMN: &str = "flood_type";
pub const FLOOD_FREQUENCY_COLUMN: &str = "flood_frequency";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    pub cleaning: CleaningConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Resolved against the configuration file's directory when relative.
    pub path: PathBuf,
    #[serde(default)]
    pub year: YearSource,
    /// Ordered projection applied after year resolution; empty keeps all columns.
    #[serde(default)]
    pub columns: Vec<ColumnSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Columns declared numeric: unparseable cells become missing.
    pub numeric_columns: Vec<String>,
    pub columns: Vec<ColumnImputation>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let temperatures = [AVG_TEMP_COLUMN, MAX_TEMP_COLUMN, MIN_TEMP_COLUMN];
        let mut columns = vec![ColumnImputation::new(
            RAINFALL_COLUMN,
            ImputationPolicy::constant_fill(0.0),
        )];
        columns.extend(
            temperatures
                .iter()
                .map(|name| ColumnImputation::new(name, ImputationPolicy::mean_fill())),
        );
        Self {
            numeric_columns: std::iter::once(RAINFALL_COLUMN)
                .chain(temperatures)
                .map(str::to_string)
                .collect(),
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub rainfall: String,
    pub avg_temp: String,
    pub max_temp: String,
    pub min_temp: String,
    pub flood_type: String,
    pub flood_frequency: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rainfall: RAINFALL_COLUMN.into(),
            avg_temp: AVG_TEMP_COLUMN.into(),
            max_temp: MAX_TEMP_COLUMN.into(),
            min_temp: MIN_TEMP_COLUMN.into(),
            flood_type: FLOOD_TYPE_COLUMN.into(),
            flood_frequency: FLOOD_FREQUENCY_COLUMN.into(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening configuration file {path:?}"))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing configuration file {path:?}"))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for source in &mut config.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("Source for {:?} must have a non-empty name", source.path);
            }
            if !names.insert(source.name.as_str()) {
                bail!("Source name '{}' is used more than once", source.name);
            }
        }
        Ok(())
    }
}
