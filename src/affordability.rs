//! Short-term rental income compared with long-term rents.
//!
//! Three rent tables (one-bedroom flats, non-detached and detached houses)
//! are extracted for one year and outer-joined so that a city missing from
//! one table keeps its other rents. Each non-region city from the base
//! statistics is then matched against the combined rent table; a record is
//! produced only when both room prices and both required rents are present.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::{
    cli::AffordabilityArgs,
    config::PipelineConfig,
    data::{serialize_rounded, serialize_rounded_opt},
    error::ReconcileResult,
    io_utils,
    join::{EntityTable, Entry, JoinKind, join},
    listings::CityStats,
    metrics::affordability_ratio,
    resolve::Resolver,
    sheet::{Sheet, SheetLayout, extract_year},
    table,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RentRow {
    pub one_bed: Option<f64>,
    pub non_detached: Option<f64>,
    pub detached: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffordabilityRecord {
    pub id: String,
    pub country: String,
    pub city: String,
    pub city_norm_rent: String,
    #[serde(serialize_with = "serialize_rounded")]
    pub rent_1bed_month: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub rent_house_detached_month: f64,
    #[serde(
        serialize_with = "serialize_rounded_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub rent_house_non_detached_month: Option<f64>,
    #[serde(serialize_with = "serialize_rounded")]
    pub affordability_private_room_vs_1bed_rent: f64,
    #[serde(serialize_with = "serialize_rounded")]
    pub affordability_entire_home_vs_house_rent: f64,
}

pub struct RentSheets<'a> {
    pub one_bed: &'a Sheet,
    pub non_detached: &'a Sheet,
    pub detached: &'a Sheet,
}

fn rent_table(
    resolver: &Resolver,
    sheet: &Sheet,
    layout: &SheetLayout,
    year: i32,
) -> ReconcileResult<EntityTable<f64>> {
    let records = extract_year(sheet, layout, year)?;
    debug!(
        "Sheet '{}': {} rent value(s) for {year}",
        sheet.name(),
        records.len()
    );
    Ok(EntityTable::from_labeled(
        resolver,
        records.into_iter().map(|r| (r.label, r.value)),
    ))
}

/// Outer-joins the three rent tables on resolved identity.
pub fn build_rent_table(
    resolver: &Resolver,
    sheets: &RentSheets<'_>,
    layout: &SheetLayout,
    year: i32,
) -> ReconcileResult<EntityTable<RentRow>> {
    let one_bed = rent_table(resolver, sheets.one_bed, layout, year)?;
    let non_detached = rent_table(resolver, sheets.non_detached, layout, year)?;
    let detached = rent_table(resolver, sheets.detached, layout, year)?;

    let mut partial = EntityTable::new();
    let (rows, _) = join(resolver, &one_bed, &non_detached, JoinKind::Full);
    for row in rows {
        partial.insert(Entry {
            name: row.name.clone(),
            label: row.label.to_string(),
            value: RentRow {
                one_bed: row.left.copied(),
                non_detached: row.right.copied(),
                detached: None,
            },
        });
    }

    let mut combined = EntityTable::new();
    let (rows, _) = join(resolver, &partial, &detached, JoinKind::Full);
    for row in rows {
        let base = row.left.copied().unwrap_or_default();
        combined.insert(Entry {
            name: row.name.clone(),
            label: row.label.to_string(),
            value: RentRow {
                detached: row.right.copied(),
                ..base
            },
        });
    }
    Ok(combined)
}

pub fn build(
    resolver: &Resolver,
    cities: &[CityStats],
    rents: &EntityTable<RentRow>,
    nights_per_month: f64,
) -> ReconcileResult<Vec<AffordabilityRecord>> {
    let mut records = Vec::new();
    let mut regions = 0usize;
    let mut unmatched = Vec::new();
    let mut incomplete = Vec::new();

    for city in cities {
        let Some(name) = city.resolve(resolver) else {
            continue;
        };
        if resolver.is_region(&name.id) {
            regions += 1;
            continue;
        }
        let Some((rent, _method)) = rents.probe(resolver, &name) else {
            unmatched.push(name.id);
            continue;
        };
        let inputs = (
            city.avg_price_private_room,
            city.avg_price_entire_home,
            rent.value.one_bed,
            rent.value.detached,
        );
        let (Some(private_room), Some(entire_home), Some(one_bed), Some(detached)) = inputs else {
            incomplete.push(name.id);
            continue;
        };
        records.push(AffordabilityRecord {
            affordability_private_room_vs_1bed_rent: affordability_ratio(
                &name.id,
                private_room,
                nights_per_month,
                one_bed,
            )?,
            affordability_entire_home_vs_house_rent: affordability_ratio(
                &name.id,
                entire_home,
                nights_per_month,
                detached,
            )?,
            id: name.id,
            country: city.country.clone(),
            city: city.city.clone(),
            city_norm_rent: rent.name.spaced.clone(),
            rent_1bed_month: one_bed,
            rent_house_detached_month: detached,
            rent_house_non_detached_month: rent.value.non_detached,
        });
    }

    info!(
        "Affordability: {} record(s); excluded {} region(s), {} without rent match, {} with missing inputs",
        records.len(),
        regions,
        unmatched.len(),
        incomplete.len()
    );
    if !unmatched.is_empty() {
        info!("No rent data for: {}", unmatched.join(", "));
    }
    if !incomplete.is_empty() {
        debug!("Missing price or rent inputs for: {}", incomplete.join(", "));
    }
    Ok(records)
}

pub fn execute(args: &AffordabilityArgs, config: &PipelineConfig) -> Result<()> {
    let resolver = config.resolver()?;
    let rent_config = &config.rent;
    let year = args.year.unwrap_or(rent_config.year);

    let cities: Vec<CityStats> = io_utils::read_json(&args.stats)?;
    let one_bed = io_utils::load_sheet(&args.rents, Some(&rent_config.one_bed_sheet))?;
    let non_detached = io_utils::load_sheet(&args.rents, Some(&rent_config.non_detached_sheet))?;
    let detached = io_utils::load_sheet(&args.rents, Some(&rent_config.detached_sheet))?;
    let sheets = RentSheets {
        one_bed: &one_bed,
        non_detached: &non_detached,
        detached: &detached,
    };

    let rents = build_rent_table(&resolver, &sheets, &rent_config.layout, year)
        .with_context(|| format!("Extracting {year} rents from {:?}", args.rents))?;
    info!("Rent table for {year}: {} entit(ies)", rents.len());

    let records = build(&resolver, &cities, &rents, config.nights_per_month)
        .context("Computing affordability ratios")?;
    if args.preview {
        table::print_records(&records)?;
    }
    io_utils::write_json_pretty(&args.output, &records)?;
    info!("Saved {} cities to {:?}", records.len(), args.output);
    Ok(())
}
