pub mod check;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod enrich;
pub mod error;
pub mod inject;
pub mod io_utils;
pub mod lookup;
pub mod pipeline;
pub mod preview;
pub mod projection;
pub mod remap;
pub mod report;
pub mod table;
pub mod temporal;

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
            builder.filter_module("scan_enrich", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => enrich::execute(&args),
        Commands::Check(args) => check::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}
