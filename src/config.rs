//! Pipeline configuration file.
//!
//! The file is YAML unless its extension is `.json`. Every section is
//! optional; an empty file describes a pipeline that passes the input through
//! unchanged.
//!
//! ```yaml
//! columns: [App ID, Application Name, Status, Severity, Scan Date]
//! drop_empty_rows: true
//! inject:
//!   - { name: Reviewer, value: Security Team }
//!   - { name: Remarks }
//! lookups:
//!   - target_column: Owner
//!     match_column: App ID
//!     reference: owners.csv
//!     key_column: Application ID
//!     value_column: App Owner
//! age: { date_column: Scan Date, target_column: Age }
//! classification:
//!   category_column: Severity
//!   label_column: Lifecycle
//!   rules:
//!     - { kind: keyword, column: Status, keyword: Outdated, value: EOL }
//!     - { kind: threshold, category: Critical, column: Age, threshold: 30, above: Out of SLO, at_or_below: Ignore }
//! remap:
//!   source_column: Lifecycle
//!   target_column: SLO Breach
//!   values: { EOL: EOL, Out of SLO: 1, Ignore: 0 }
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classify::{ClassificationRule, RuleSet},
    data::Value,
    error::ConfigError,
    inject::{ColumnDefault, InjectPosition},
    lookup::{DEFAULT_UNMATCHED_PLACEHOLDER, LookupSpec},
    remap::RemapTable,
    temporal::AgeColumn,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Columns to keep, in output order. Empty keeps all.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub drop_empty_rows: bool,
    #[serde(default)]
    pub inject: Vec<ColumnDefault>,
    #[serde(default)]
    pub inject_position: InjectPosition,
    #[serde(default)]
    pub lookups: Vec<LookupSpec>,
    #[serde(default = "PipelineConfig::default_placeholder")]
    pub unmatched_placeholder: String,
    #[serde(default)]
    pub age: Option<AgeColumn>,
    #[serde(default)]
    pub classification: Option<ClassificationConfig>,
    #[serde(default)]
    pub remap: Option<RemapConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            drop_empty_rows: false,
            inject: Vec::new(),
            inject_position: InjectPosition::default(),
            lookups: Vec::new(),
            unmatched_placeholder: Self::default_placeholder(),
            age: None,
            classification: None,
            remap: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClassificationConfig {
    pub category_column: String,
    pub label_column: String,
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
}

impl ClassificationConfig {
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::new(self.category_column.clone(), &self.rules)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemapConfig {
    pub source_column: String,
    /// Defaults to overwriting `source_column`.
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub default: Value,
}

impl RemapConfig {
    pub fn target(&self) -> &str {
        self.target_column
            .as_deref()
            .unwrap_or(self.source_column.as_str())
    }

    pub fn table(&self) -> RemapTable {
        RemapTable {
            values: self.values.clone(),
            default: self.default.clone(),
        }
    }
}

impl PipelineConfig {
    fn default_placeholder() -> String {
        DEFAULT_UNMATCHED_PLACEHOLDER.to_string()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: PipelineConfig = if is_json {
            serde_json::from_reader(reader).context("Parsing config JSON")?
        } else {
            serde_yaml::from_reader(reader).context("Parsing config YAML")?
        };
        config
            .validate()
            .with_context(|| format!("Validating config {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(raw).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, column) in self.inject.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(ConfigError::EmptyInjectedColumn { index: index + 1 });
            }
        }
        for (index, spec) in self.lookups.iter().enumerate() {
            let fields = [
                ("target_column", &spec.target_column),
                ("match_column", &spec.match_column),
                ("reference", &spec.reference),
                ("key_column", &spec.key_column),
                ("value_column", &spec.value_column),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
                return Err(ConfigError::EmptyLookupField {
                    index: index + 1,
                    field: *field,
                });
            }
        }
        if let Some(age) = &self.age {
            if age.date_column.trim().is_empty() {
                return Err(ConfigError::MissingRuleColumn {
                    rule: "age",
                    field: "date_column",
                });
            }
            if age.target_column.trim().is_empty() {
                return Err(ConfigError::MissingRuleColumn {
                    rule: "age",
                    field: "target_column",
                });
            }
        }
        if let Some(classification) = &self.classification {
            if classification.label_column.trim().is_empty() {
                return Err(ConfigError::MissingRuleColumn {
                    rule: "classification",
                    field: "label_column",
                });
            }
            classification.rule_set()?;
        }
        if let Some(remap) = &self.remap {
            if remap.source_column.trim().is_empty() {
                return Err(ConfigError::EmptyRemapColumn {
                    field: "source_column",
                });
            }
            if remap.target().trim().is_empty() {
                return Err(ConfigError::EmptyRemapColumn {
                    field: "target_column",
                });
            }
        }
        Ok(())
    }
}
