use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::CleanArgs,
    coerce::coerce_declared,
    config::{CleaningConfig, Config},
    frame::{Column, Table},
    impute::impute_table,
    io_utils::{self, describe_destination, resolve_encoding, resolve_input_delimiter},
    printable_delimiter,
    report::{render_cleaning_summary, summarize_cleaning},
    schema::normalize_table,
    year_key::{YearSource, resolve_year},
};

pub fn execute(args: &CleanArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let encoding = resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Cleaning '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let raw = io_utils::read_table(&args.input, "cleaned", delimiter, encoding)?;
    let cleaned = clean_table(&raw, &config.cleaning)?;

    io_utils::write_table(&cleaned, args.output.as_deref(), delimiter)?;
    info!(
        "Wrote {} cleaned row(s) to {}",
        cleaned.row_count(),
        describe_destination(args.output.as_deref())
    );

    let keyed = resolve_year(&normalize_table(&cleaned)?, &YearSource::Auto)
        .with_context(|| format!("Resolving the year key of {:?}", args.input))?;
    let summary = summarize_cleaning(&keyed, &config.analysis)?;
    print!("{}", render_cleaning_summary(&summary, &config.analysis));
    Ok(())
}

/// Coerces the declared numeric columns and imputes `raw`, returning a table
/// with the same shape and the original column names. Undeclared columns pass
/// through unchanged.
pub fn clean_table(raw: &Table, cleaning: &CleaningConfig) -> Result<Table> {
    let working = normalize_table(raw)?;
    let working = coerce_declared(&working, &cleaning.numeric_columns)?;
    let working = impute_table(&working, &cleaning.columns)?;
    let restored = raw
        .columns()
        .iter()
        .zip(working.into_columns())
        .map(|(original, cleaned)| Column::new(original.name.clone(), cleaned.cells))
        .collect();
    Ok(raw.with_columns(restored)?)
}
