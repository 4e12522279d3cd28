use std::{collections::HashMap, mem};

use itertools::Itertools;
use log::{debug, info};

use crate::resolve::{MatchMethod, ResolvedName, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

/// Which row survives when two labels of one source resolve to the same
/// entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    KeepFirst,
    KeepLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub name: ResolvedName,
    pub label: String,
    pub value: T,
}

impl<T> Entry<T> {
    pub fn id(&self) -> &str {
        &self.name.id
    }
}

/// Per-entity values keyed by canonical identifier, in insertion order.
#[derive(Debug, Clone)]
pub struct EntityTable<T> {
    entries: Vec<Entry<T>>,
    by_id: HashMap<String, usize>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        EntityTable {
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(label, value)` pairs. Labels that normalize to
    /// nothing are dropped; when two labels resolve to the same entity the
    /// first one is kept.
    pub fn from_labeled<I, S>(resolver: &Resolver, rows: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        Self::from_labeled_with(resolver, rows, Duplicates::KeepFirst)
    }

    pub fn from_labeled_with<I, S>(resolver: &Resolver, rows: I, duplicates: Duplicates) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let mut table = EntityTable::new();
        for (label, value) in rows {
            let label = label.as_ref();
            let Some(name) = resolver.resolve_name(Some(label)) else {
                debug!("Dropping row with empty label '{label}'");
                continue;
            };
            let entry = Entry {
                name,
                label: label.to_string(),
                value,
            };
            match duplicates {
                Duplicates::KeepFirst => {
                    table.insert(entry);
                }
                Duplicates::KeepLast => {
                    if let Some(previous) = table.replace(entry) {
                        debug!(
                            "Entity '{}' from label '{}' superseded by a later row",
                            previous.id(),
                            previous.label
                        );
                    }
                }
            }
        }
        table
    }

    /// Inserts an entry, keeping any existing entry for the same identifier.
    pub fn insert(&mut self, entry: Entry<T>) -> bool {
        if self.by_id.contains_key(entry.id()) {
            debug!(
                "Duplicate entity '{}' from label '{}' ignored",
                entry.id(),
                entry.label
            );
            return false;
        }
        self.by_id.insert(entry.id().to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Inserts an entry, replacing any existing entry for the same identifier
    /// in place. Returns the replaced entry.
    pub fn replace(&mut self, entry: Entry<T>) -> Option<Entry<T>> {
        match self.by_id.get(entry.id()).copied() {
            Some(idx) => Some(mem::replace(&mut self.entries[idx], entry)),
            None => {
                self.by_id.insert(entry.id().to_string(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entry<T>> {
        self.by_id.get(id).map(|idx| &self.entries[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<T>> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<Entry<T>> {
        self.entries
    }

    pub fn spaced_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.name.spaced.as_str())
            .collect()
    }

    /// Finds the entry a resolved name refers to: canonical identifier first,
    /// then approximate matching on spaced keys.
    pub fn probe(&self, resolver: &Resolver, query: &ResolvedName) -> Option<(&Entry<T>, MatchMethod)> {
        if let Some(entry) = self.get(&query.id) {
            let method = if entry.name.key == query.key {
                MatchMethod::Exact
            } else {
                MatchMethod::Alias
            };
            return Some((entry, method));
        }
        let keys = self.spaced_keys();
        let found = resolver.fuzzy(query, &keys)?;
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.name.spaced == found.candidate)?;
        Some((
            entry,
            MatchMethod::Fuzzy {
                score: found.score,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow<'a, L, R> {
    pub name: &'a ResolvedName,
    pub label: &'a str,
    pub left: Option<&'a L>,
    pub right: Option<&'a R>,
    pub method: Option<MatchMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub matched: usize,
    pub fuzzy: usize,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
}

/// Joins two tables on resolved identity. Left rows are probed against the
/// right table; unmatched rows from either side are kept according to `kind`.
pub fn join<'a, L, R>(
    resolver: &Resolver,
    left: &'a EntityTable<L>,
    right: &'a EntityTable<R>,
    kind: JoinKind,
) -> (Vec<JoinedRow<'a, L, R>>, JoinReport) {
    let include_unmatched_left = matches!(kind, JoinKind::Left | JoinKind::Full);
    let include_unmatched_right = matches!(kind, JoinKind::Right | JoinKind::Full);

    let mut rows = Vec::new();
    let mut report = JoinReport::default();
    let mut matched_right = vec![false; right.len()];

    for entry in left.iter() {
        match right.probe(resolver, &entry.name) {
            Some((hit, method)) => {
                report.matched += 1;
                if method.is_fuzzy() {
                    report.fuzzy += 1;
                }
                if let Some(idx) = right.by_id.get(hit.id()) {
                    matched_right[*idx] = true;
                }
                rows.push(JoinedRow {
                    name: &entry.name,
                    label: &entry.label,
                    left: Some(&entry.value),
                    right: Some(&hit.value),
                    method: Some(method),
                });
            }
            None => {
                report.left_only.push(entry.id().to_string());
                if include_unmatched_left {
                    rows.push(JoinedRow {
                        name: &entry.name,
                        label: &entry.label,
                        left: Some(&entry.value),
                        right: None,
                        method: None,
                    });
                }
            }
        }
    }

    for (entry, matched) in right.entries.iter().zip(&matched_right) {
        if *matched {
            continue;
        }
        report.right_only.push(entry.id().to_string());
        if include_unmatched_right {
            rows.push(JoinedRow {
                name: &entry.name,
                label: &entry.label,
                left: None,
                right: Some(&entry.value),
                method: None,
            });
        }
    }

    info!(
        "Join complete: {} output row(s), {} matched ({} fuzzy), {} left-only, {} right-only",
        rows.len(),
        report.matched,
        report.fuzzy,
        report.left_only.len(),
        report.right_only.len()
    );
    if !report.left_only.is_empty() {
        debug!(
            "Unmatched left entities: {}",
            report.left_only.iter().sorted().dedup().join(", ")
        );
    }
    (rows, report)
}
