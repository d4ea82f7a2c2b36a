use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::{
    cli::CombineArgs,
    coerce::coerce_table,
    config::{Config, SourceConfig},
    frame::{Table, YEAR_COLUMN},
    io_utils::{self, describe_destination, resolve_encoding, resolve_input_delimiter},
    merge::merge_tables,
    printable_delimiter,
    schema::{ColumnSelection, dedupe_columns, normalize_column_name, normalize_table, select_columns},
    year_key::resolve_year,
};

pub fn execute(args: &CombineArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    if config.sources.is_empty() {
        bail!("Configuration {:?} lists no sources to combine", args.config);
    }
    let encoding = resolve_encoding(args.input_encoding.as_deref())?;

    let mut tables = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let delimiter = resolve_input_delimiter(&source.path, args.delimiter);
        info!(
            "Loading source '{}' from {:?} with delimiter '{}'",
            source.name,
            source.path,
            printable_delimiter(delimiter)
        );
        let raw = io_utils::read_table(&source.path, &source.name, delimiter, encoding)?;
        let table = prepare_source(&raw, source)
            .with_context(|| format!("Preparing source '{}'", source.name))?;
        debug!(
            "Source '{}' contributes columns {:?}",
            source.name,
            table.column_names()
        );
        tables.push(table);
    }

    let merged = merge_tables(&tables).context("Merging sources")?;
    let output_delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    io_utils::write_table(&merged, args.output.as_deref(), output_delimiter)?;
    info!(
        "Wrote {} merged row(s) to {}",
        merged.row_count(),
        describe_destination(args.output.as_deref())
    );
    Ok(())
}

/// Normalizes, year-keys, projects, and coerces one raw source table.
pub fn prepare_source(raw: &Table, source: &SourceConfig) -> Result<Table> {
    let table = dedupe_columns(&normalize_table(raw)?)?;
    let table = resolve_year(&table, &source.year)?;
    let table = select_columns(&table, &with_year(&source.columns))?;
    Ok(coerce_table(&table, &[])?)
}

/// The year key always survives projection and leads the selection.
fn with_year(selections: &[ColumnSelection]) -> Vec<ColumnSelection> {
    if selections.is_empty() {
        return Vec::new();
    }
    let mut projected = vec![ColumnSelection::keep(YEAR_COLUMN)];
    projected.extend(
        selections
            .iter()
            .filter(|s| normalize_column_name(s.output_name()) != YEAR_COLUMN)
            .cloned(),
    );
    projected
}
