//! Resolution of raw labels to canonical identifiers.
//!
//! Lookup order is fixed: the normalized key itself, then the alias table,
//! and only then approximate matching. Fuzzy matches are logged so that every
//! non-exact pairing can be audited after a run.

use log::info;

use crate::{
    alias::AliasTable,
    fuzzy::{FuzzyMatch, FuzzyMatcher},
    normalize::{KeyStyle, normalize},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMethod {
    Exact,
    Alias,
    Fuzzy { score: f64 },
}

impl MatchMethod {
    pub fn is_fuzzy(&self) -> bool {
        matches!(self, MatchMethod::Fuzzy { .. })
    }
}

/// Keys derived from one raw label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Canonical identifier after alias resolution.
    pub id: String,
    /// Identifier-style key before alias resolution.
    pub key: String,
    /// Space-separated key used for approximate matching.
    pub spaced: String,
}

impl ResolvedName {
    pub fn via_alias(&self) -> bool {
        self.id != self.key
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    aliases: AliasTable,
    matcher: FuzzyMatcher,
}

impl Resolver {
    pub fn new(aliases: AliasTable, matcher: FuzzyMatcher) -> Self {
        Resolver { aliases, matcher }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Normalizes and alias-resolves a label. Labels that normalize to the
    /// empty key resolve to nothing.
    pub fn resolve_name(&self, raw: Option<&str>) -> Option<ResolvedName> {
        let key = normalize(raw, KeyStyle::Identifier);
        if key.is_empty() {
            return None;
        }
        let id = self.aliases.resolve(&key);
        let spaced = normalize(raw, KeyStyle::Spaced);
        Some(ResolvedName { id, key, spaced })
    }

    pub fn canonical_id(&self, raw: Option<&str>) -> Option<String> {
        self.resolve_name(raw).map(|name| name.id)
    }

    pub fn is_region(&self, canonical_id: &str) -> bool {
        self.aliases.is_region(canonical_id)
    }

    /// Approximate fallback over spaced candidate keys.
    pub fn fuzzy<'a, S>(&self, query: &ResolvedName, candidates: &'a [S]) -> Option<FuzzyMatch<'a>>
    where
        S: AsRef<str>,
    {
        let found = self.matcher.best_match(&query.spaced, candidates)?;
        info!(
            "Fuzzy match '{}' -> '{}' (score {:.3}, threshold {:.2})",
            query.spaced,
            found.candidate,
            found.score,
            self.matcher.threshold()
        );
        Some(found)
    }
}
