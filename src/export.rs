//! Reduced listing extracts for the map layers: timeline points and slim
//! heat-map files.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use log::info;

use crate::{
    cli::{SlimArgs, TimelineArgs},
    config::PipelineConfig,
    data::{Cell, clean_price, parse_numeric},
    io_utils,
};

pub const TIMELINE_COLUMNS: [&str; 6] = [
    "id",
    "latitude",
    "longitude",
    "room_type",
    "first_year",
    "last_year",
];
pub const SLIM_COLUMNS: [&str; 5] = ["latitude", "longitude", "price", "room_type", "name"];

/// Year of a review date; unparseable dates are absent.
pub fn review_year(raw: &str) -> Option<i32> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .map(|date| date.year())
}

fn read_columns(
    path: &Path,
    columns: &[&str],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<Vec<String>>> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let indices = io_utils::column_indices(&headers, columns, path)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        rows.push(
            indices
                .iter()
                .map(|idx| decoded.get(*idx).map(|v| v.trim().to_string()).unwrap_or_default())
                .collect(),
        );
    }
    Ok(rows)
}

fn format_number(value: f64) -> String {
    Cell::Number(value).as_display()
}

/// Keeps listings with coordinates and both review years, first reviewed in
/// or after `min_first_year`. Input columns follow [`TIMELINE_COLUMNS`] with
/// raw review dates in place of years.
pub fn timeline_rows(rows: &[Vec<String>], min_first_year: i32) -> Vec<Vec<String>> {
    rows.iter()
        .filter_map(|row| {
            let [id, lat, lng, room_type, first, last] = row.as_slice() else {
                return None;
            };
            let latitude = parse_numeric(lat)?;
            let longitude = parse_numeric(lng)?;
            let first_year = review_year(first)?;
            let last_year = review_year(last)?;
            (first_year >= min_first_year).then(|| {
                vec![
                    id.clone(),
                    format_number(latitude),
                    format_number(longitude),
                    room_type.clone(),
                    first_year.to_string(),
                    last_year.to_string(),
                ]
            })
        })
        .collect()
}

/// Keeps listings with coordinates; prices are cleaned and left blank when
/// they cannot be read.
pub fn slim_rows(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    rows.iter()
        .filter_map(|row| {
            let [lat, lng, price, room_type, name] = row.as_slice() else {
                return None;
            };
            let latitude = parse_numeric(lat)?;
            let longitude = parse_numeric(lng)?;
            Some(vec![
                format_number(latitude),
                format_number(longitude),
                clean_price(price).map(format_number).unwrap_or_default(),
                room_type.clone(),
                name.clone(),
            ])
        })
        .collect()
}

pub fn execute_timeline(args: &TimelineArgs, config: &PipelineConfig) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let min_year = args.min_year.unwrap_or(config.timeline.min_first_year);
    let source = [
        "id",
        "latitude",
        "longitude",
        "room_type",
        "first_review",
        "last_review",
    ];
    let rows = read_columns(&args.input, &source, delimiter, encoding)?;
    let kept = timeline_rows(&rows, min_year);
    io_utils::write_csv(&args.output, &TIMELINE_COLUMNS, &kept)?;
    info!(
        "Saved {:?}: {} of {} listing(s) first reviewed in or after {min_year}",
        args.output,
        kept.len(),
        rows.len()
    );
    Ok(())
}

pub fn execute_slim(args: &SlimArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let rows = read_columns(&args.input, &SLIM_COLUMNS, delimiter, encoding)?;
    let kept = slim_rows(&rows);
    io_utils::write_csv(&args.output, &SLIM_COLUMNS, &kept)?;

    let original = fs::metadata(&args.input).map(|m| m.len()).unwrap_or(0);
    let reduced = fs::metadata(&args.output).map(|m| m.len()).unwrap_or(0);
    if original > 0 {
        info!(
            "Saved {:?}: {} listing(s), {:.2} MB -> {:.2} MB ({:.0}% smaller)",
            args.output,
            kept.len(),
            original as f64 / (1024.0 * 1024.0),
            reduced as f64 / (1024.0 * 1024.0),
            100.0 * (1.0 - reduced as f64 / original as f64)
        );
    } else {
        info!("Saved {:?}: {} listing(s)", args.output, kept.len());
    }
    Ok(())
}
