use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    charts::{ChartColumns, build_charts},
    cli::AnalyzeArgs,
    coerce::coerce_table,
    config::Config,
    frame::Table,
    io_utils::{self, resolve_encoding, resolve_input_delimiter},
    printable_delimiter,
    report::{analyze, render_analysis},
    schema::{dedupe_columns, normalize_table},
    year_key::{YearSource, resolve_year},
};

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let encoding = resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Analyzing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let raw = io_utils::read_table(&args.input, "analysis", delimiter, encoding)?;
    let table = prepare(&raw).with_context(|| format!("Preparing {:?}", args.input))?;

    let report = analyze(&table, &config.analysis)?;
    print!("{}", render_analysis(&report)?);

    if let Some(path) = &args.json {
        write_json(path, &report)?;
        info!("Report written to {path:?}");
    }
    if let Some(path) = &args.charts {
        let roles = &config.analysis;
        let bundle = build_charts(
            &table,
            &report.decades,
            report.regression.as_ref(),
            ChartColumns {
                rainfall: &roles.rainfall,
                avg_temp: &roles.avg_temp,
                flood_frequency: &roles.flood_frequency,
            },
        )?;
        write_json(path, &bundle)?;
        info!("Chart series written to {path:?}");
    }
    Ok(())
}

/// Canonical names, one column per name, a leading year key, and numeric
/// columns inferred from content.
pub fn prepare(raw: &Table) -> Result<Table> {
    let table = dedupe_columns(&normalize_table(raw)?)?;
    let table = resolve_year(&table, &YearSource::Auto)?;
    Ok(coerce_table(&table, &[])?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Writing JSON to {path:?}"))
}
