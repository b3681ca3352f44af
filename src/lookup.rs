//! Key-based enrichment from reference tables.
//!
//! Each [`LookupSpec`] names a reference table, the key and value columns to
//! read from it, the column of the main dataset to match on, and the column to
//! fill. Specs run one after another; each builds its own [`LookupTable`],
//! fills its target column, and contributes missed row positions to a shared,
//! deduplicated unmatched set.

use std::{
    collections::{BTreeSet, HashMap},
    path::PathBuf,
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{dataset::Dataset, io_utils};

pub const DEFAULT_UNMATCHED_PLACEHOLDER: &str = "ID not found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LookupSpec {
    pub target_column: String,
    pub match_column: String,
    /// Identifier handed to the [`ReferenceSource`], typically a file name.
    pub reference: String,
    pub key_column: String,
    pub value_column: String,
}

/// Supplies reference tables by identifier.
pub trait ReferenceSource {
    /// Returns `Ok(None)` when the reference does not exist. Errors are reserved
    /// for references that exist but cannot be read.
    fn load(&self, reference: &str) -> Result<Option<Dataset>>;
}

/// Resolves reference identifiers as delimited files beneath a directory.
#[derive(Debug, Clone)]
pub struct DirectoryReferences {
    root: PathBuf,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
}

impl DirectoryReferences {
    pub fn new(root: impl Into<PathBuf>, delimiter: Option<u8>, encoding: &'static Encoding) -> Self {
        Self {
            root: root.into(),
            delimiter,
            encoding,
        }
    }
}

impl ReferenceSource for DirectoryReferences {
    fn load(&self, reference: &str) -> Result<Option<Dataset>> {
        let path = self.root.join(reference);
        if !path.is_file() {
            return Ok(None);
        }
        let delimiter = io_utils::resolve_delimiter(&path, self.delimiter);
        let dataset = Dataset::load(&path, delimiter, self.encoding)
            .with_context(|| format!("Loading reference table {path:?}"))?;
        Ok(Some(dataset))
    }
}

/// Reference tables held in memory, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryReferences {
    tables: HashMap<String, Dataset>,
}

impl MemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<String>, dataset: Dataset) {
        self.tables.insert(reference.into(), dataset);
    }

    pub fn with(mut self, reference: impl Into<String>, dataset: Dataset) -> Self {
        self.insert(reference, dataset);
        self
    }
}

impl ReferenceSource for MemoryReferences {
    fn load(&self, reference: &str) -> Result<Option<Dataset>> {
        Ok(self.tables.get(reference).cloned())
    }
}

/// Exact-match key → value map built from one reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: HashMap<String, String>,
}

impl LookupTable {
    /// Builds the table from `key_column`/`value_column` of `reference`.
    /// Later rows overwrite earlier rows with the same key; blank keys are
    /// ignored. Returns `None` when either column is missing.
    pub fn from_dataset(reference: &Dataset, key_column: &str, value_column: &str) -> Option<Self> {
        let key_idx = reference.column_index(key_column)?;
        let value_idx = reference.column_index(value_column)?;
        let pairs = reference.rows().iter().map(|row| {
            (
                row.get(key_idx).cloned().unwrap_or_default(),
                row.get(value_idx).cloned().unwrap_or_default(),
            )
        });
        Some(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if key.is_empty() {
                continue;
            }
            entries.insert(key, value.into());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    Applied,
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSummary {
    pub target_column: String,
    pub match_column: String,
    pub reference: String,
    pub matched: usize,
    pub unmatched: usize,
    pub status: LookupStatus,
}

impl LookupSummary {
    fn skipped(spec: &LookupSpec, reason: String) -> Self {
        Self {
            target_column: spec.target_column.clone(),
            match_column: spec.match_column.clone(),
            reference: spec.reference.clone(),
            matched: 0,
            unmatched: 0,
            status: LookupStatus::Skipped(reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, LookupStatus::Skipped(_))
    }
}

/// Accumulated result of every lookup in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOutcome {
    pub summaries: Vec<LookupSummary>,
    /// Positions of rows that missed at least one lookup.
    pub unmatched: BTreeSet<usize>,
}

impl LookupOutcome {
    pub fn total_matched(&self) -> usize {
        self.summaries.iter().map(|s| s.matched).sum()
    }

    pub fn total_unmatched(&self) -> usize {
        self.summaries.iter().map(|s| s.unmatched).sum()
    }
}

/// Fills `spec.target_column` from `table`, writing `placeholder` on a miss and
/// recording missed positions in `unmatched`. The target column is created if
/// absent. A missing match column reads as blank, so every row misses.
pub fn apply_lookup(
    dataset: &mut Dataset,
    spec: &LookupSpec,
    table: &LookupTable,
    placeholder: &str,
    unmatched: &mut BTreeSet<usize>,
) -> LookupSummary {
    let target_idx = dataset.ensure_column(&spec.target_column);
    let match_idx = dataset.column_index(&spec.match_column);
    if match_idx.is_none() {
        warn!(
            "Match column '{}' not found; every row will miss lookup for '{}'",
            spec.match_column, spec.target_column
        );
    }

    let mut matched = 0usize;
    let mut missed = 0usize;
    dataset.for_each_row_mut(|position, row| {
        let key = match_idx
            .and_then(|idx| row.get(idx))
            .map(|s| s.as_str())
            .unwrap_or("");
        let filled = match table.get(key) {
            Some(value) => {
                matched += 1;
                value.to_string()
            }
            None => {
                missed += 1;
                unmatched.insert(position);
                placeholder.to_string()
            }
        };
        if let Some(cell) = row.get_mut(target_idx) {
            *cell = filled;
        }
    });

    info!(
        "Lookup '{}' via '{}': {} matched, {} unmatched",
        spec.target_column, spec.reference, matched, missed
    );
    LookupSummary {
        target_column: spec.target_column.clone(),
        match_column: spec.match_column.clone(),
        reference: spec.reference.clone(),
        matched,
        unmatched: missed,
        status: LookupStatus::Applied,
    }
}

/// Runs every lookup in order against `dataset`. Unavailable references and
/// references lacking the key or value column skip that lookup after creating
/// its target column.
pub fn run_lookups(
    dataset: &mut Dataset,
    specs: &[LookupSpec],
    source: &dyn ReferenceSource,
    placeholder: &str,
) -> Result<LookupOutcome> {
    let mut outcome = LookupOutcome::default();
    for spec in specs {
        dataset.ensure_column(&spec.target_column);

        let Some(reference) = source
            .load(&spec.reference)
            .with_context(|| format!("Loading reference '{}'", spec.reference))?
        else {
            let reason = format!("reference '{}' not found", spec.reference);
            warn!("Skipping lookup for '{}': {reason}", spec.target_column);
            outcome.summaries.push(LookupSummary::skipped(spec, reason));
            continue;
        };

        let Some(table) = LookupTable::from_dataset(&reference, &spec.key_column, &spec.value_column)
        else {
            let reason = format!(
                "reference '{}' lacks column '{}' or '{}'",
                spec.reference, spec.key_column, spec.value_column
            );
            warn!("Skipping lookup for '{}': {reason}", spec.target_column);
            outcome.summaries.push(LookupSummary::skipped(spec, reason));
            continue;
        };
        debug!(
            "Built lookup table with {} key(s) from '{}'",
            table.len(),
            spec.reference
        );

        let summary = apply_lookup(dataset, spec, &table, placeholder, &mut outcome.unmatched);
        outcome.summaries.push(summary);
    }
    Ok(outcome)
}
