//! Share of the housing stock listed for short-term rental.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::{
    cli::HousingPressureArgs,
    config::PipelineConfig,
    data::serialize_rounded,
    error::ReconcileResult,
    io_utils,
    join::EntityTable,
    listings::CityStats,
    metrics::housing_pressure_share,
    resolve::Resolver,
    sheet::{SourceRecord, extract_latest},
    table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HousingPressureRecord {
    pub id: String,
    pub country: String,
    pub city: String,
    pub year: i32,
    pub airbnb_homes: u64,
    #[serde(serialize_with = "serialize_rounded")]
    pub total_housing: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub airbnb_share: f64,
}

/// One record per base-statistics entity whose housing stock is known. The
/// stock table is probed from the city side, so each record carries the
/// city's canonical identifier even when the stock label only matched
/// approximately.
pub fn build(
    resolver: &Resolver,
    housing: Vec<SourceRecord>,
    cities: &[CityStats],
) -> ReconcileResult<Vec<HousingPressureRecord>> {
    let stock = EntityTable::from_labeled(
        resolver,
        housing.into_iter().map(|r| (r.label, (r.value, r.year))),
    );

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    for city in cities {
        let Some(name) = city.resolve(resolver) else {
            continue;
        };
        if !seen.insert(name.id.clone()) {
            debug!("Duplicate base statistics for '{}' ignored", name.id);
            continue;
        }
        let Some((entry, _method)) = stock.probe(resolver, &name) else {
            missing.push(name.id);
            continue;
        };
        let (total_housing, year) = entry.value;
        records.push(HousingPressureRecord {
            airbnb_share: housing_pressure_share(&name.id, city.count as f64, total_housing)?,
            id: name.id,
            country: city.country.clone(),
            city: city.city.clone(),
            year,
            airbnb_homes: city.count,
            total_housing,
        });
    }

    info!(
        "Housing pressure: {} record(s), {} listing location(s) without housing data",
        records.len(),
        missing.len()
    );
    if !missing.is_empty() {
        info!("No housing stock for: {}", missing.join(", "));
    }
    Ok(records)
}

pub fn execute(args: &HousingPressureArgs, config: &PipelineConfig) -> Result<()> {
    let resolver = config.resolver()?;
    let cities: Vec<CityStats> = io_utils::read_json(&args.stats)?;
    let sheet = io_utils::load_sheet(&args.housing, config.housing.sheet.as_deref())?;
    let housing = extract_latest(&sheet, &config.housing.layout)
        .with_context(|| format!("Extracting housing stock from {:?}", args.housing))?;

    let records = build(&resolver, housing, &cities).context("Computing housing pressure")?;
    if args.preview {
        table::print_records(&records)?;
    }
    io_utils::write_json_pretty(&args.output, &records)?;
    info!("Saved {} cities to {:?}", records.len(), args.output);
    Ok(())
}
