use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Enrich and classify security-scan inventory files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the enrichment pipeline over an input file
    Run(RunArgs),
    /// Validate a pipeline configuration and list its lookups and rules
    Check(CheckArgs),
    /// Preview the first few rows of a delimited file in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input file to enrich
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Pipeline configuration (YAML, or JSON by extension)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Enriched output file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Directory holding reference tables (defaults to the config file's directory)
    #[arg(short = 'r', long = "references")]
    pub references: Option<PathBuf>,
    /// Destination for rows that missed at least one lookup
    #[arg(long = "unmatched")]
    pub unmatched: Option<PathBuf>,
    /// Destination for the per-lookup match summary
    #[arg(long = "summary")]
    pub summary: Option<PathBuf>,
    /// Reference date for age calculation (YYYY-MM-DD, defaults to today)
    #[arg(long = "as-of", value_parser = parse_as_of)]
    pub as_of: Option<NaiveDate>,
    /// CSV delimiter character for inputs and outputs
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of input and reference files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Print the lookup summary as a table when the run completes
    #[arg(long = "show-summary")]
    pub show_summary: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Pipeline configuration to validate
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_as_of(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("Expected YYYY-MM-DD: {err}"))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
