pub mod aggregate;
pub mod analyze;
pub mod charts;
pub mod clean;
pub mod cli;
pub mod coerce;
pub mod combine;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod impute;
pub mod io_utils;
pub mod merge;
pub mod report;
pub mod schema;
pub mod stats;
pub mod table;
pub mod trend;
pub mod year_key;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("weather_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Combine(args) => combine::execute(&args),
        Commands::Clean(args) => clean::execute(&args),
        Commands::Analyze(args) => analyze::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
