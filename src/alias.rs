//! Hand-curated equivalences between normalized keys and canonical identifiers.
//!
//! The table ships as a versioned JSON asset (`data/aliases.json`) compiled
//! into the binary. A replacement asset with the same schema can be supplied
//! through the pipeline configuration.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ReconcileError, ReconcileResult},
    normalize::{KeyStyle, identifier_key, restyle},
};

const BUILTIN_ASSET: &str = include_str!("../data/aliases.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasAsset {
    pub version: u32,
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AliasTable {
    version: u32,
    aliases: HashMap<String, String>,
    regions: HashSet<String>,
}

impl AliasTable {
    pub fn builtin() -> ReconcileResult<Self> {
        Self::from_json(BUILTIN_ASSET)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading alias table {path:?}"))?;
        Self::from_json(&raw).with_context(|| format!("Loading alias table {path:?}"))
    }

    pub fn from_json(raw: &str) -> ReconcileResult<Self> {
        let asset: AliasAsset = serde_json::from_str(raw)
            .map_err(|err| ReconcileError::Config(format!("alias table is not valid JSON: {err}")))?;
        Self::from_asset(asset)
    }

    pub fn from_asset(asset: AliasAsset) -> ReconcileResult<Self> {
        for (key, target) in &asset.aliases {
            ensure_identifier(key, "alias key")?;
            ensure_identifier(target, "alias target")?;
            if asset.aliases.contains_key(target) {
                return Err(ReconcileError::Config(format!(
                    "alias '{key}' points at '{target}', which is itself an alias"
                )));
            }
        }
        for region in &asset.regions {
            ensure_identifier(region, "region")?;
        }
        Ok(AliasTable {
            version: asset.version,
            aliases: asset.aliases.into_iter().collect(),
            regions: asset.regions.into_iter().collect(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Returns the canonical identifier the key is an alias of, if any.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let key = restyle(key, KeyStyle::Identifier);
        self.aliases.get(&key).map(String::as_str)
    }

    /// Maps a normalized key to its canonical identifier, defaulting to the
    /// key itself (in identifier form).
    pub fn resolve(&self, key: &str) -> String {
        let key = restyle(key, KeyStyle::Identifier);
        match self.aliases.get(&key) {
            Some(target) => target.clone(),
            None => key,
        }
    }

    pub fn is_region(&self, canonical_id: &str) -> bool {
        self.regions.contains(canonical_id)
    }
}

fn ensure_identifier(value: &str, what: &str) -> ReconcileResult<()> {
    if value.is_empty() || identifier_key(value) != value {
        return Err(ReconcileError::Config(format!(
            "{what} '{value}' is not a normalized identifier"
        )));
    }
    Ok(())
}
