//! CSV boundary of the pipeline.
//!
//! Tables are read whole into memory and written whole at the end of a
//! command; no stage streams. `-` routes through stdin/stdout, input bytes are
//! decoded with `encoding_rs`, and output is always UTF-8.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::frame::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    Ok(if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    })
}

/// Reads a whole CSV file into a [`Table`] labelled `name`.
///
/// Records may be shorter than the header (trailing cells read as missing),
/// but not longer.
pub fn read_table(
    path: &Path,
    name: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(open_input(path)?);
    let header_record = reader
        .byte_headers()
        .with_context(|| format!("Reading headers of {path:?}"))?
        .clone();
    let mut headers = decode_record(&header_record, encoding)?;
    if let Some(first) = headers.first_mut() {
        // Spreadsheet exports often lead with a UTF-8 byte order mark.
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
        if record.len() > headers.len() {
            return Err(anyhow!(
                "Row {} of {path:?} has {} field(s) but the header has {}",
                row_idx + 2,
                record.len(),
                headers.len()
            ));
        }
        rows.push(decode_record(&record, encoding)?);
    }
    debug!(
        "Read {} row(s) x {} column(s) from {path:?}",
        rows.len(),
        headers.len()
    );
    Ok(Table::from_rows(name, &headers, &rows))
}

/// Writes `table` as CSV to `path`, or stdout when `path` is absent or `-`.
pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(sink);
    writer
        .write_record(table.column_names())
        .context("Writing output headers")?;
    for row in 0..table.row_count() {
        let cells = table.row(row).into_iter().map(|cell| cell.as_display());
        writer
            .write_record(cells)
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

pub fn describe_destination(path: Option<&Path>) -> String {
    path.filter(|p| !is_dash(p))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string())
}
