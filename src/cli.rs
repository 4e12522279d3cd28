use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile city-level rental, population and housing statistics",
    long_about = None
)]
pub struct Cli {
    /// YAML pipeline configuration overriding the built-in defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Aggregate raw listing exports into per-city base statistics
    Listings(ListingsArgs),
    /// Compare short-term rental prices with long-term rents
    Affordability(AffordabilityArgs),
    /// Rank cities by listings per 1,000 residents
    Density(DensityArgs),
    /// Compute listings as a share of the housing stock
    HousingPressure(HousingPressureArgs),
    /// Extract timeline points (first/last review year) from a listing export
    Timeline(TimelineArgs),
    /// Extract the columns needed for heat maps from a listing export
    Slim(SlimArgs),
}

#[derive(Debug, Args)]
pub struct ListingsArgs {
    /// JSON array of source descriptors (country, city, filename, currency)
    #[arg(short, long)]
    pub descriptors: PathBuf,
    /// Directory holding the raw listing files named by the descriptors
    #[arg(long = "raw-dir")]
    pub raw_dir: PathBuf,
    /// Destination JSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// CSV delimiter character for the listing files
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the listing files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct AffordabilityArgs {
    /// Base statistics JSON produced by `listings`
    #[arg(short, long)]
    pub stats: PathBuf,
    /// Workbook holding the rent sheets
    #[arg(short, long)]
    pub rents: PathBuf,
    /// Destination JSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Rent year to extract (overrides the configuration)
    #[arg(long)]
    pub year: Option<i32>,
    /// Print the result set as a table
    #[arg(long)]
    pub preview: bool,
}

#[derive(Debug, Args)]
pub struct DensityArgs {
    /// Base statistics JSON produced by `listings`
    #[arg(short, long)]
    pub stats: PathBuf,
    /// Population workbook or delimited file
    #[arg(short, long)]
    pub population: PathBuf,
    /// Destination JSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Print the result set as a table
    #[arg(long)]
    pub preview: bool,
}

#[derive(Debug, Args)]
pub struct HousingPressureArgs {
    /// Base statistics JSON produced by `listings`
    #[arg(short, long)]
    pub stats: PathBuf,
    /// Housing stock workbook or delimited file
    #[arg(long)]
    pub housing: PathBuf,
    /// Destination JSON file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Print the result set as a table
    #[arg(long)]
    pub preview: bool,
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Full listing export
    #[arg(short, long)]
    pub input: PathBuf,
    /// Destination CSV file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Earliest first-review year to keep (overrides the configuration)
    #[arg(long = "min-year")]
    pub min_year: Option<i32>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct SlimArgs {
    /// Listing export to reduce
    #[arg(short, long)]
    pub input: PathBuf,
    /// Destination CSV file ('-' for stdout)
    #[arg(short, long)]
    pub output: PathBuf,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
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
