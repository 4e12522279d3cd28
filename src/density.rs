//! Listings per 1,000 residents, ranked.

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    cli::DensityArgs,
    config::PipelineConfig,
    data::serialize_rounded,
    error::ReconcileResult,
    io_utils,
    join::{Duplicates, EntityTable},
    listings::CityStats,
    metrics::density_per_thousand,
    resolve::Resolver,
    sheet::{SourceRecord, extract_latest},
    table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityRecord {
    pub id: String,
    pub country: String,
    pub city: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub population: f64,
    pub population_year: i32,
    #[serde(serialize_with = "serialize_rounded")]
    pub listings: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub airbnbs_per_1k: f64,
}

/// Population and the year it was measured, keyed by entity. When several
/// rows resolve to one entity the last row counts.
pub fn population_table(resolver: &Resolver, records: Vec<SourceRecord>) -> EntityTable<(f64, i32)> {
    EntityTable::from_labeled_with(
        resolver,
        records.into_iter().map(|r| (r.label, (r.value, r.year))),
        Duplicates::KeepLast,
    )
}

pub fn build(
    resolver: &Resolver,
    cities: &[CityStats],
    population: &EntityTable<(f64, i32)>,
) -> ReconcileResult<Vec<DensityRecord>> {
    let mut records = Vec::new();
    let mut missing = Vec::new();

    for city in cities {
        let Some(name) = city.resolve(resolver) else {
            continue;
        };
        let Some((entry, _method)) = population.probe(resolver, &name) else {
            missing.push(name.id);
            continue;
        };
        let (residents, year) = entry.value;
        let listings = city.count as f64;
        records.push(DensityRecord {
            airbnbs_per_1k: density_per_thousand(&name.id, listings, residents)?,
            id: name.id,
            country: city.country.clone(),
            city: city.city.clone(),
            population: residents,
            population_year: year,
            listings,
        });
    }

    records.sort_by(|a, b| b.airbnbs_per_1k.total_cmp(&a.airbnbs_per_1k));

    info!("Density: {} record(s)", records.len());
    if !missing.is_empty() {
        info!(
            "Missing population for {} location(s): {}",
            missing.len(),
            missing.iter().sorted().dedup().join(", ")
        );
    }
    Ok(records)
}

pub fn execute(args: &DensityArgs, config: &PipelineConfig) -> Result<()> {
    let resolver = config.resolver()?;
    let cities: Vec<CityStats> = io_utils::read_json(&args.stats)?;
    let sheet = io_utils::load_sheet(&args.population, config.population.sheet.as_deref())?;
    let extracted = extract_latest(&sheet, &config.population.layout)
        .with_context(|| format!("Extracting population from {:?}", args.population))?;
    let population = population_table(&resolver, extracted);
    info!("Population table: {} entit(ies)", population.len());

    let records = build(&resolver, &cities, &population).context("Computing listing density")?;
    if args.preview {
        table::print_records(&records)?;
    }
    io_utils::write_json_pretty(&args.output, &records)?;
    info!("Wrote {} rows to {:?}", records.len(), args.output);
    Ok(())
}
