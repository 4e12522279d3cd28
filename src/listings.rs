//! Per-city base statistics aggregated from raw listing exports.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    cli::ListingsArgs,
    config::PipelineConfig,
    currency::CurrencyTable,
    data::{clean_price, mean, parse_numeric},
    error::{ReconcileError, ReconcileResult},
    io_utils,
    resolve::{ResolvedName, Resolver},
};

const PRIVATE_ROOM: &str = "private room";
const ENTIRE_HOME: &str = "entire home/apt";

/// Where one city's raw listings live and which currency their prices use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub country: String,
    pub city: String,
    pub filename: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Base statistics for one entity. Prices are nightly EUR averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityStats {
    pub id: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub avg_price_private_room: Option<f64>,
    #[serde(default)]
    pub avg_price_entire_home: Option<f64>,
    pub count: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl CityStats {
    /// Resolves the entity this row describes, by display name first and
    /// identifier second.
    pub fn resolve(&self, resolver: &Resolver) -> Option<ResolvedName> {
        resolver
            .resolve_name(Some(&self.city))
            .or_else(|| resolver.resolve_name(Some(&self.id)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingRow {
    pub price: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub room_type: Option<String>,
}

pub fn aggregate(
    resolver: &Resolver,
    currencies: &CurrencyTable,
    descriptor: &SourceDescriptor,
    rows: &[ListingRow],
) -> ReconcileResult<CityStats> {
    // Fail on an unmapped currency even when no row carries a price.
    currencies.rate(&descriptor.currency)?;
    let id = resolver
        .canonical_id(Some(&descriptor.city))
        .ok_or_else(|| {
            ReconcileError::Config(format!(
                "descriptor for '{}' has no usable city name",
                descriptor.filename
            ))
        })?;

    let mut prices = Vec::new();
    let mut private_room = Vec::new();
    let mut entire_home = Vec::new();
    for row in rows {
        let Some(price) = currencies.convert(row.price, &descriptor.currency)? else {
            continue;
        };
        prices.push(price);
        match row.room_type.as_deref().map(|t| t.trim().to_lowercase()) {
            Some(t) if t == PRIVATE_ROOM => private_room.push(price),
            Some(t) if t == ENTIRE_HOME => entire_home.push(price),
            _ => {}
        }
    }
    let latitudes: Vec<f64> = rows.iter().filter_map(|r| r.latitude).collect();
    let longitudes: Vec<f64> = rows.iter().filter_map(|r| r.longitude).collect();

    Ok(CityStats {
        id,
        country: descriptor.country.clone(),
        city: descriptor.city.clone(),
        avg_price: mean(&prices),
        avg_price_private_room: mean(&private_room),
        avg_price_entire_home: mean(&entire_home),
        count: rows.len() as u64,
        lat: mean(&latitudes),
        lng: mean(&longitudes),
    })
}

pub fn read_listing_rows(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<ListingRow>> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let required = io_utils::column_indices(&headers, &["price", "latitude", "longitude"], path)?;
    let (price_idx, lat_idx, lng_idx) = (required[0], required[1], required[2]);
    let room_idx = headers.iter().position(|h| h.trim() == "room_type");
    if room_idx.is_none() {
        warn!("{path:?} has no room_type column; room-type averages will be absent");
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        let field = |idx: usize| decoded.get(idx).map(String::as_str).unwrap_or("");
        rows.push(ListingRow {
            price: clean_price(field(price_idx)),
            latitude: parse_numeric(field(lat_idx)),
            longitude: parse_numeric(field(lng_idx)),
            room_type: room_idx
                .map(field)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        });
    }
    Ok(rows)
}

pub fn execute(args: &ListingsArgs, config: &PipelineConfig) -> Result<()> {
    let resolver = config.resolver()?;
    let currencies = config.currencies()?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let descriptors: Vec<SourceDescriptor> = io_utils::read_json(&args.descriptors)?;
    info!(
        "Aggregating listings for {} source(s) from {:?}",
        descriptors.len(),
        args.raw_dir
    );

    let mut stats = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let path = args.raw_dir.join(&descriptor.filename);
        if !path.exists() {
            return Err(anyhow!(
                "Listing file {path:?} for {} ({}) does not exist",
                descriptor.city,
                descriptor.country
            ));
        }
        let delimiter = io_utils::resolve_input_delimiter(&path, args.delimiter);
        let rows = read_listing_rows(&path, delimiter, encoding)
            .with_context(|| format!("Reading listings for {}", descriptor.city))?;
        let city = aggregate(&resolver, &currencies, descriptor, &rows)
            .with_context(|| format!("Aggregating listings for {}", descriptor.city))?;
        info!(
            "{}: {} listing(s), mean price {}",
            city.id,
            city.count,
            city.avg_price
                .map(|p| format!("{p:.2} EUR"))
                .unwrap_or_else(|| "absent".to_string())
        );
        stats.push(city);
    }

    io_utils::write_json_pretty(&args.output, &stats)?;
    info!("Processed {} city source(s) into {:?}", stats.len(), args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alias::AliasTable, fuzzy::FuzzyMatcher};

    fn descriptor(city: &str, currency: &str) -> SourceDescriptor {
        SourceDescriptor {
            country: "Austria".to_string(),
            city: city.to_string(),
            filename: "wien.csv".to_string(),
            currency: currency.to_string(),
        }
    }

    fn row(price: Option<f64>, room: &str) -> ListingRow {
        ListingRow {
            price,
            latitude: Some(48.2),
            longitude: Some(16.4),
            room_type: Some(room.to_string()),
        }
    }

    fn resolver() -> Resolver {
        Resolver::new(AliasTable::builtin().unwrap(), FuzzyMatcher::default())
    }

    #[test]
    fn aggregates_means_by_room_type() {
        let rows = vec![
            row(Some(100.0), "Private room"),
            row(Some(200.0), "Entire home/apt"),
            row(Some(300.0), "Entire home/apt"),
            row(None, "Shared room"),
        ];
        let stats = aggregate(
            &resolver(),
            &CurrencyTable::default(),
            &descriptor("Wien", "EUR"),
            &rows,
        )
        .unwrap();
        assert_eq!(stats.id, "vienna");
        assert_eq!(stats.city, "Wien");
        assert_eq!(stats.count, 4);
        assert_eq!(stats.avg_price, Some(200.0));
        assert_eq!(stats.avg_price_private_room, Some(100.0));
        assert_eq!(stats.avg_price_entire_home, Some(250.0));
        assert_eq!(stats.lat, Some(48.2));
    }

    #[test]
    fn unknown_currency_fails_even_without_prices() {
        let rows = vec![row(None, "Private room")];
        let err = aggregate(
            &resolver(),
            &CurrencyTable::default(),
            &descriptor("Wien", "ZZZ"),
            &rows,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownCurrency {
                code: "ZZZ".to_string()
            }
        );
    }

    #[test]
    fn prices_are_converted_to_eur() {
        let rows = vec![row(Some(100.0), "Private room")];
        let stats = aggregate(
            &resolver(),
            &CurrencyTable::default(),
            &descriptor("London", "GBP"),
            &rows,
        )
        .unwrap();
        assert!((stats.avg_price.unwrap() - 117.0).abs() < 1e-9);
    }

    #[test]
    fn empty_listing_file_has_absent_averages() {
        let stats = aggregate(
            &resolver(),
            &CurrencyTable::default(),
            &descriptor("Wien", "EUR"),
            &[],
        )
        .unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_price, None);
        assert_eq!(stats.lat, None);
    }
}
