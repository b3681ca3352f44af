//! Configuration errors detected before any data is touched.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("keyword rule on column '{column}' has an empty keyword")]
    EmptyKeyword { column: String },

    #[error("threshold rule has an empty category")]
    EmptyCategory,

    #[error("category '{category}' is defined by more than one threshold rule")]
    DuplicateCategory { category: String },

    #[error("{rule} rule is missing its '{field}' column")]
    MissingRuleColumn { rule: &'static str, field: &'static str },

    #[error("lookup #{index} has an empty '{field}'")]
    EmptyLookupField { index: usize, field: &'static str },

    #[error("remap requires a non-empty '{field}' column")]
    EmptyRemapColumn { field: &'static str },

    #[error("injected column #{index} has an empty name")]
    EmptyInjectedColumn { index: usize },
}
