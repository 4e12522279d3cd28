//! Pipeline configuration.
//!
//! Every knob has a default that reproduces the published pipeline, so a
//! configuration file only needs to list what it changes:
//!
//! ```yaml
//! fuzzy_threshold: 0.9
//! currency_rates:
//!   GBP: 1.16
//! rent:
//!   year: 2022
//! ```

use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    alias::AliasTable,
    currency::CurrencyTable,
    error::ReconcileError,
    fuzzy::{DEFAULT_THRESHOLD, FuzzyMatcher},
    metrics::DEFAULT_NIGHTS_PER_MONTH,
    resolve::Resolver,
    sheet::SheetLayout,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub fuzzy_threshold: f64,
    pub nights_per_month: f64,
    /// Replacement for the built-in alias table.
    pub alias_table: Option<PathBuf>,
    /// Added to, or overriding, the built-in EUR rates.
    pub currency_rates: BTreeMap<String, f64>,
    pub rent: RentConfig,
    pub population: SheetConfig,
    pub housing: SheetConfig,
    pub timeline: TimelineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            fuzzy_threshold: DEFAULT_THRESHOLD,
            nights_per_month: DEFAULT_NIGHTS_PER_MONTH,
            alias_table: None,
            currency_rates: BTreeMap::new(),
            rent: RentConfig::default(),
            population: SheetConfig {
                sheet: None,
                layout: SheetLayout {
                    skip_prefixes: vec!["cities".to_string()],
                    ..SheetLayout::year_header(0.5)
                },
            },
            housing: SheetConfig {
                sheet: None,
                layout: SheetLayout::year_header(0.5),
            },
            timeline: TimelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RentConfig {
    pub year: i32,
    pub one_bed_sheet: String,
    pub non_detached_sheet: String,
    pub detached_sheet: String,
    pub layout: SheetLayout,
}

impl Default for RentConfig {
    fn default() -> Self {
        RentConfig {
            year: 2023,
            one_bed_sheet: "Sheet 5".to_string(),
            non_detached_sheet: "Sheet 1".to_string(),
            detached_sheet: "Sheet 2".to_string(),
            layout: SheetLayout::time_geo(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    /// Worksheet to read; the first sheet when omitted.
    #[serde(default)]
    pub sheet: Option<String>,
    pub layout: SheetLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineConfig {
    pub min_first_year: i32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            min_first_year: 2015,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration {path:?}"))?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing configuration {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating configuration {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        FuzzyMatcher::new(self.fuzzy_threshold)?;
        if !self.nights_per_month.is_finite() || self.nights_per_month <= 0.0 {
            return Err(ReconcileError::Config(format!(
                "nights_per_month must be positive, got {}",
                self.nights_per_month
            )));
        }
        self.currencies()?;
        Ok(())
    }

    pub fn currencies(&self) -> Result<CurrencyTable, ReconcileError> {
        CurrencyTable::default().merged_with(&self.currency_rates)
    }

    pub fn resolver(&self) -> Result<Resolver> {
        let aliases = match &self.alias_table {
            Some(path) => AliasTable::load(path)?,
            None => AliasTable::builtin()?,
        };
        let matcher = FuzzyMatcher::new(self.fuzzy_threshold)?;
        Ok(Resolver::new(aliases, matcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::RowMarker;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: PipelineConfig = serde_yaml::from_str(
            "fuzzy_threshold: 0.9\ncurrency_rates:\n  gbp: 1.2\nrent:\n  year: 2022\n",
        )
        .unwrap();
        assert_eq!(config.fuzzy_threshold, 0.9);
        assert_eq!(config.rent.year, 2022);
        assert_eq!(config.rent.one_bed_sheet, "Sheet 5");
        assert_eq!(config.nights_per_month, 30.0);
        assert_eq!(config.currencies().unwrap().rate("GBP").unwrap(), 1.2);
        assert_eq!(config.timeline.min_first_year, 2015);
    }

    #[test]
    fn sheet_layouts_are_configurable() {
        let config: PipelineConfig = serde_yaml::from_str(
            "housing:\n  sheet: Data\n  layout:\n    header:\n      kind: label\n      token: TIME\n",
        )
        .unwrap();
        assert_eq!(config.housing.sheet.as_deref(), Some("Data"));
        assert_eq!(config.housing.layout.header, RowMarker::label("TIME"));
        assert_eq!(config.population.layout.skip_prefixes, vec!["cities"]);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let config = PipelineConfig {
            fuzzy_threshold: 2.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = PipelineConfig {
            nights_per_month: 0.0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(serde_yaml::from_str::<PipelineConfig>("unknown_key: 1").is_err());
    }

    #[test]
    fn default_resolver_uses_builtin_aliases() {
        let resolver = PipelineConfig::default().resolver().unwrap();
        assert_eq!(resolver.canonical_id(Some("Praha")).as_deref(), Some("prague"));
        assert_eq!(resolver.matcher().threshold(), DEFAULT_THRESHOLD);
    }
}
