pub mod affordability;
pub mod alias;
pub mod cli;
pub mod config;
pub mod currency;
pub mod data;
pub mod density;
pub mod error;
pub mod export;
pub mod fuzzy;
pub mod io_utils;
pub mod join;
pub mod listings;
pub mod metrics;
pub mod normalize;
pub mod pressure;
pub mod resolve;
pub mod sheet;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("city_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    debug!("Pipeline configuration: {config:?}");
    match cli.command {
        Commands::Listings(args) => listings::execute(&args, &config).context("listings"),
        Commands::Affordability(args) => {
            affordability::execute(&args, &config).context("affordability")
        }
        Commands::Density(args) => density::execute(&args, &config).context("density"),
        Commands::HousingPressure(args) => {
            pressure::execute(&args, &config).context("housing-pressure")
        }
        Commands::Timeline(args) => export::execute_timeline(&args, &config).context("timeline"),
        Commands::Slim(args) => export::execute_slim(&args).context("slim"),
    }
}
