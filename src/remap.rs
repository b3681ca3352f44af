use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{data::Value, dataset::Dataset};

/// Label → final value, with a default for anything unmapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemapTable {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub default: Value,
}

impl RemapTable {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default: Value::default(),
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    pub fn resolve(&self, label: &str) -> String {
        self.values
            .get(label)
            .unwrap_or(&self.default)
            .as_display()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemapReport {
    pub mapped: usize,
    pub defaulted: usize,
}

/// Writes `table.resolve(label)` into `target_column` for every row. The target
/// may be the source column itself. A missing source column reads as blank.
pub fn remap_column(
    dataset: &mut Dataset,
    source_column: &str,
    target_column: &str,
    table: &RemapTable,
) -> RemapReport {
    let source_idx = dataset.column_index(source_column);
    if source_idx.is_none() {
        warn!("Remap source column '{source_column}' not found; writing defaults");
    }
    let target_idx = dataset.ensure_column(target_column);

    let mut report = RemapReport::default();
    dataset.for_each_row_mut(|_, row| {
        let label = source_idx
            .and_then(|idx| row.get(idx))
            .map(|s| s.as_str())
            .unwrap_or("");
        if table.values.contains_key(label) {
            report.mapped += 1;
        } else {
            report.defaulted += 1;
        }
        let resolved = table.resolve(label);
        if let Some(cell) = row.get_mut(target_idx) {
            *cell = resolved;
        }
    });

    info!(
        "Remapped '{}' into '{}': {} mapped, {} defaulted",
        source_column, target_column, report.mapped, report.defaulted
    );
    report
}
