//! Extraction of entity/value pairs from loosely structured statistical sheets.
//!
//! Published statistics rarely start at row zero: a block of metadata rows
//! precedes the real header, year columns carry qualifier text, and the entity
//! rows may only begin after a second label row. A [`SheetLayout`] describes
//! how to find those rows so that each publication format is configuration
//! rather than code.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::Cell,
    error::{ReconcileError, ReconcileResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    /// Builds a sheet from text cells; blank strings become empty cells.
    pub fn from_text_rows<R, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| {
                        let value = value.as_ref();
                        if value.trim().is_empty() {
                            Cell::Empty
                        } else {
                            Cell::text(value)
                        }
                    })
                    .collect()
            })
            .collect();
        Sheet::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}

/// Predicate identifying a structural row of a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowMarker {
    /// The first column holds `token`, exactly or as a substring.
    Label {
        token: String,
        #[serde(default)]
        contains: bool,
    },
    /// At least `min_fraction` of the non-empty cells are years.
    YearDensity { min_fraction: f64 },
}

impl RowMarker {
    pub fn label(token: impl Into<String>) -> Self {
        RowMarker::Label {
            token: token.into(),
            contains: false,
        }
    }

    pub fn label_containing(token: impl Into<String>) -> Self {
        RowMarker::Label {
            token: token.into(),
            contains: true,
        }
    }

    pub fn matches(&self, row: &[Cell]) -> bool {
        match self {
            RowMarker::Label { token, contains } => {
                let Some(first) = row.first().and_then(Cell::label) else {
                    return false;
                };
                if *contains {
                    first.contains(token.as_str())
                } else {
                    first == *token
                }
            }
            RowMarker::YearDensity { min_fraction } => {
                let filled = row.iter().filter(|c| **c != Cell::Empty).count();
                let years = row.iter().filter(|c| c.year().is_some()).count();
                years > 0 && years as f64 / filled as f64 >= *min_fraction
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            RowMarker::Label { token, .. } => format!("'{token}' marker"),
            RowMarker::YearDensity { .. } => "year header".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub header: RowMarker,
    #[serde(default)]
    pub data_start: Option<RowMarker>,
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

impl SheetLayout {
    /// Eurostat exports: years on the `TIME` row, entities after the `GEO` row.
    pub fn time_geo() -> Self {
        SheetLayout {
            header: RowMarker::label("TIME"),
            data_start: Some(RowMarker::label_containing("GEO")),
            skip_prefixes: vec!["Special value".to_string()],
        }
    }

    /// Plain tables whose header is the first row made up of years.
    pub fn year_header(min_fraction: f64) -> Self {
        SheetLayout {
            header: RowMarker::YearDensity { min_fraction },
            data_start: None,
            skip_prefixes: Vec::new(),
        }
    }

    fn skips(&self, label: &str) -> bool {
        let lowered = label.to_lowercase();
        self.skip_prefixes
            .iter()
            .any(|prefix| lowered.starts_with(&prefix.to_lowercase()))
    }
}

/// One extracted row: an entity label and its value for a period.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub label: String,
    pub year: i32,
    pub value: f64,
}

/// Located structure of a sheet: where entity rows start and which columns
/// hold which year, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFrame {
    pub header_row: usize,
    pub data_start: usize,
    pub year_columns: Vec<(usize, i32)>,
}

impl SheetFrame {
    pub fn years(&self) -> BTreeSet<i32> {
        self.year_columns.iter().map(|(_, year)| *year).collect()
    }

    fn columns_for(&self, year: i32) -> impl Iterator<Item = usize> + '_ {
        self.year_columns
            .iter()
            .filter(move |(_, y)| *y == year)
            .map(|(col, _)| *col)
    }
}

pub fn locate(sheet: &Sheet, layout: &SheetLayout) -> ReconcileResult<SheetFrame> {
    let rows = sheet.rows();
    let header_row = rows
        .iter()
        .position(|row| layout.header.matches(row))
        .ok_or_else(|| ReconcileError::HeaderNotFound {
            sheet: sheet.name().to_string(),
            marker: layout.header.describe(),
        })?;

    let year_columns: Vec<(usize, i32)> = rows[header_row]
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(col, cell)| cell.year().map(|year| (col, year)))
        .collect();
    if year_columns.is_empty() {
        return Err(ReconcileError::YearNotFound {
            sheet: sheet.name().to_string(),
            year: "any".to_string(),
        });
    }

    let data_start = match &layout.data_start {
        None => header_row + 1,
        Some(marker) => {
            let offset = rows[header_row + 1..]
                .iter()
                .position(|row| marker.matches(row))
                .ok_or_else(|| ReconcileError::HeaderNotFound {
                    sheet: sheet.name().to_string(),
                    marker: marker.describe(),
                })?;
            header_row + 1 + offset + 1
        }
    };

    debug!(
        "Sheet '{}': header at row {}, data from row {}, {} year column(s)",
        sheet.name(),
        header_row,
        data_start,
        year_columns.len()
    );
    Ok(SheetFrame {
        header_row,
        data_start,
        year_columns,
    })
}

/// Values for a single requested year. For each entity the first column
/// mapped to that year holding a number wins.
pub fn extract_year(
    sheet: &Sheet,
    layout: &SheetLayout,
    year: i32,
) -> ReconcileResult<Vec<SourceRecord>> {
    let frame = locate(sheet, layout)?;
    if frame.columns_for(year).next().is_none() {
        return Err(ReconcileError::YearNotFound {
            sheet: sheet.name().to_string(),
            year: year.to_string(),
        });
    }
    Ok(entity_rows(sheet, layout, &frame)
        .filter_map(|(label, row)| {
            first_value(row, frame.columns_for(year)).map(|value| SourceRecord {
                label,
                year,
                value,
            })
        })
        .collect())
}

/// Values for the most recent year that has a number, per entity.
pub fn extract_latest(sheet: &Sheet, layout: &SheetLayout) -> ReconcileResult<Vec<SourceRecord>> {
    let frame = locate(sheet, layout)?;
    let years = frame.years();
    Ok(entity_rows(sheet, layout, &frame)
        .filter_map(|(label, row)| {
            years.iter().rev().find_map(|year| {
                first_value(row, frame.columns_for(*year)).map(|value| SourceRecord {
                    label: label.clone(),
                    year: *year,
                    value,
                })
            })
        })
        .collect())
}

fn entity_rows<'a>(
    sheet: &'a Sheet,
    layout: &'a SheetLayout,
    frame: &SheetFrame,
) -> impl Iterator<Item = (String, &'a [Cell])> + 'a {
    sheet
        .rows()
        .iter()
        .skip(frame.data_start)
        .filter_map(move |row| {
            let label = row.first().and_then(Cell::label)?;
            if layout.skips(&label) {
                return None;
            }
            Some((label, row.as_slice()))
        })
}

fn first_value(row: &[Cell], mut columns: impl Iterator<Item = usize>) -> Option<f64> {
    columns.find_map(|col| row.get(col).and_then(Cell::numeric))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eurostat_sheet() -> Sheet {
        Sheet::from_text_rows(
            "Sheet 1",
            vec![
                vec!["Average rent", "", "", ""],
                vec!["Unit", "EUR", "", ""],
                vec!["", "", "", ""],
                vec!["TIME", "2022", "2023", "2023"],
                vec!["GEO (Labels)", "", "", ""],
                vec!["Wien (greater city)", "900", ":", "950"],
                vec!["Praha", "700", "720", "730"],
                vec!["Oslo", ":", ":", ":"],
                vec!["", "1", "2", "3"],
                vec!["Special value", "", "", ""],
            ],
        )
    }

    #[test]
    fn fixed_year_takes_first_present_column() {
        let records = extract_year(&eurostat_sheet(), &SheetLayout::time_geo(), 2023).unwrap();
        assert_eq!(
            records,
            vec![
                SourceRecord {
                    label: "Wien (greater city)".to_string(),
                    year: 2023,
                    value: 950.0
                },
                SourceRecord {
                    label: "Praha".to_string(),
                    year: 2023,
                    value: 720.0
                },
            ]
        );
    }

    #[test]
    fn missing_year_column_is_an_error() {
        let err = extract_year(&eurostat_sheet(), &SheetLayout::time_geo(), 2019).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::YearNotFound {
                sheet: "Sheet 1".to_string(),
                year: "2019".to_string()
            }
        );
    }

    #[test]
    fn missing_markers_are_errors() {
        let sheet = Sheet::from_text_rows("x", vec![vec!["GEO", "2020"], vec!["Paris", "1"]]);
        assert!(matches!(
            locate(&sheet, &SheetLayout::time_geo()),
            Err(ReconcileError::HeaderNotFound { .. })
        ));
        let sheet = Sheet::from_text_rows("x", vec![vec!["TIME", "2020"], vec!["Paris", "1"]]);
        assert!(matches!(
            locate(&sheet, &SheetLayout::time_geo()),
            Err(ReconcileError::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn latest_and_fixed_modes_differ() {
        let sheet = Sheet::from_text_rows(
            "population",
            vec![
                vec!["Population on 1 January", "", "", "", ""],
                vec!["CITIES", "2020", "2021", "2022", "2023"],
                vec!["Amsterdam", "870000", ":", "880000", ":"],
                vec!["Cities with data", "", "", "", ""],
            ],
        );
        let mut layout = SheetLayout::year_header(0.5);
        layout.skip_prefixes.push("cities".to_string());

        let latest = extract_latest(&sheet, &layout).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!((latest[0].year, latest[0].value), (2022, 880000.0));

        let fixed = extract_year(&sheet, &layout, 2021).unwrap();
        assert!(fixed.is_empty());
    }

    #[test]
    fn year_density_ignores_rows_with_few_years() {
        let sheet = Sheet::from_text_rows(
            "housing",
            vec![
                vec!["Dwellings", "released 2024", "note", "x"],
                vec!["City", "2019 (b)", "2021", "2021 (p)"],
                vec!["Lyon", "", "300000", "310000"],
            ],
        );
        let layout = SheetLayout::year_header(0.5);
        let frame = locate(&sheet, &layout).unwrap();
        assert_eq!(frame.header_row, 1);
        assert_eq!(frame.year_columns, vec![(1, 2019), (2, 2021), (3, 2021)]);
        let latest = extract_latest(&sheet, &layout).unwrap();
        assert_eq!((latest[0].year, latest[0].value), (2021, 300000.0));
    }

    #[test]
    fn layouts_deserialize_from_config() {
        let layout: SheetLayout = serde_json::from_str(
            r#"{"header": {"kind": "label", "token": "TIME"},
                "data_start": {"kind": "label", "token": "GEO", "contains": true}}"#,
        )
        .unwrap();
        assert_eq!(layout.data_start, Some(RowMarker::label_containing("GEO")));
        assert!(layout.skip_prefixes.is_empty());
    }
}
