//! Approximate matching of normalized keys, used only after exact and alias
//! lookups have failed.

use similar::TextDiff;

use crate::error::{ReconcileError, ReconcileResult};

pub const DEFAULT_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub candidate: &'a str,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        FuzzyMatcher {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> ReconcileResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ReconcileError::Config(format!(
                "fuzzy threshold must lie within 0.0..=1.0, got {threshold}"
            )));
        }
        Ok(FuzzyMatcher { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the candidate with the highest similarity at or above the
    /// threshold. Equal scores keep the earliest candidate.
    pub fn best_match<'a, S>(&self, key: &str, candidates: &'a [S]) -> Option<FuzzyMatch<'a>>
    where
        S: AsRef<str>,
    {
        if key.is_empty() {
            return None;
        }
        let mut best: Option<FuzzyMatch<'a>> = None;
        for candidate in candidates.iter().map(AsRef::as_ref) {
            if candidate.is_empty() {
                continue;
            }
            if candidate == key {
                return Some(FuzzyMatch {
                    candidate,
                    score: 1.0,
                });
            }
            let score = similarity(key, candidate);
            if score < self.threshold {
                continue;
            }
            if best.is_none_or(|current| score > current.score) {
                best = Some(FuzzyMatch { candidate, score });
            }
        }
        best
    }
}

/// `2·M / T` similarity over characters, where `M` is the length of the
/// longest common subsequence (Myers diff) and `T` the combined length.
/// Transpositions therefore score higher than under matching-block ratios:
/// `tide`/`diet` is 0.5 here.
pub fn similarity(left: &str, right: &str) -> f64 {
    f64::from(TextDiff::from_chars(left, right).ratio())
}
