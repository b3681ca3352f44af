//! Ordered, per-row classification rules.
//!
//! Rules come in two kinds. A [`KeywordOverrideRule`] fires when its trigger
//! column contains a keyword and decides the label outright. Otherwise the
//! row's category picks exactly one [`ThresholdRule`], which compares a numeric
//! column against a threshold. Keyword rules always run before threshold rules,
//! whatever order the configuration lists them in.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{dataset::Dataset, error::ConfigError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeywordOverrideRule {
    pub column: String,
    /// Matched as a case-insensitive substring.
    pub keyword: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdRule {
    /// Compared trimmed and case-insensitively against the category column.
    pub category: String,
    /// Column holding the integer compared against `threshold`.
    pub column: String,
    pub threshold: i64,
    pub above: String,
    pub at_or_below: String,
    /// Return `above` without consulting `column` at all.
    #[serde(default)]
    pub always_above: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationRule {
    Keyword(KeywordOverrideRule),
    Threshold(ThresholdRule),
}

impl ClassificationRule {
    /// Lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            ClassificationRule::Keyword(_) => 0,
            ClassificationRule::Threshold(_) => 1,
        }
    }
}

/// Which branch of the rule set produced a row's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'a> {
    Keyword(&'a str),
    Above(&'a str),
    AtOrBelow(&'a str),
    NoCategoryRule,
    Unparsable,
}

impl<'a> Decision<'a> {
    pub fn label(&self) -> &'a str {
        match self {
            Decision::Keyword(label) | Decision::Above(label) | Decision::AtOrBelow(label) => {
                *label
            }
            Decision::NoCategoryRule | Decision::Unparsable => "",
        }
    }
}

#[derive(Debug, Clone)]
struct KeywordMatcher {
    rule: KeywordOverrideRule,
    needle: String,
}

/// A validated rule list ready to evaluate.
#[derive(Debug, Clone)]
pub struct RuleSet {
    category_column: String,
    keywords: Vec<KeywordMatcher>,
    thresholds: Vec<ThresholdRule>,
    by_category: HashMap<String, usize>,
}

fn category_key(value: &str) -> String {
    value.trim().to_lowercase()
}

impl RuleSet {
    pub fn new(
        category_column: impl Into<String>,
        rules: &[ClassificationRule],
    ) -> Result<Self, ConfigError> {
        let mut ordered: Vec<&ClassificationRule> = rules.iter().collect();
        ordered.sort_by_key(|rule| rule.priority());

        let mut keywords = Vec::new();
        let mut thresholds = Vec::new();
        let mut by_category = HashMap::new();
        for rule in ordered {
            match rule {
                ClassificationRule::Keyword(rule) => {
                    if rule.column.trim().is_empty() {
                        return Err(ConfigError::MissingRuleColumn {
                            rule: "keyword",
                            field: "column",
                        });
                    }
                    if rule.keyword.is_empty() {
                        return Err(ConfigError::EmptyKeyword {
                            column: rule.column.clone(),
                        });
                    }
                    keywords.push(KeywordMatcher {
                        needle: rule.keyword.to_lowercase(),
                        rule: rule.clone(),
                    });
                }
                ClassificationRule::Threshold(rule) => {
                    let key = category_key(&rule.category);
                    if key.is_empty() {
                        return Err(ConfigError::EmptyCategory);
                    }
                    if rule.column.trim().is_empty() && !rule.always_above {
                        return Err(ConfigError::MissingRuleColumn {
                            rule: "threshold",
                            field: "column",
                        });
                    }
                    if by_category.contains_key(&key) {
                        return Err(ConfigError::DuplicateCategory {
                            category: rule.category.clone(),
                        });
                    }
                    by_category.insert(key, thresholds.len());
                    thresholds.push(rule.clone());
                }
            }
        }

        Ok(Self {
            category_column: category_column.into(),
            keywords,
            thresholds,
            by_category,
        })
    }

    pub fn category_column(&self) -> &str {
        &self.category_column
    }

    pub fn keyword_rules(&self) -> impl Iterator<Item = &KeywordOverrideRule> {
        self.keywords.iter().map(|k| &k.rule)
    }

    pub fn threshold_rules(&self) -> &[ThresholdRule] {
        &self.thresholds
    }

    /// Resolves column names against `headers` once for a whole pass.
    pub fn bind<'a>(&'a self, headers: &[String]) -> BoundRules<'a> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        BoundRules {
            rules: self,
            keyword_columns: self
                .keywords
                .iter()
                .map(|k| position(&k.rule.column))
                .collect(),
            category_column: position(&self.category_column),
            threshold_columns: self.thresholds.iter().map(|t| position(&t.column)).collect(),
        }
    }
}

/// A [`RuleSet`] with its columns resolved against one dataset's headers.
/// Missing columns read as blank.
#[derive(Debug)]
pub struct BoundRules<'a> {
    rules: &'a RuleSet,
    keyword_columns: Vec<Option<usize>>,
    category_column: Option<usize>,
    threshold_columns: Vec<Option<usize>>,
}

impl<'a> BoundRules<'a> {
    pub fn classify(&self, row: &[String]) -> Decision<'a> {
        let rules: &'a RuleSet = self.rules;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|s| s.as_str())
                .unwrap_or("")
        };

        for (matcher, column) in rules.keywords.iter().zip(&self.keyword_columns) {
            if cell(*column).to_lowercase().contains(&matcher.needle) {
                return Decision::Keyword(&matcher.rule.value);
            }
        }

        let category = category_key(cell(self.category_column));
        let Some(&rule_idx) = rules.by_category.get(&category) else {
            return Decision::NoCategoryRule;
        };
        let rule = &rules.thresholds[rule_idx];
        if rule.always_above {
            return Decision::Above(&rule.above);
        }
        match cell(self.threshold_columns[rule_idx]).trim().parse::<i64>() {
            Ok(value) if value > rule.threshold => Decision::Above(&rule.above),
            Ok(_) => Decision::AtOrBelow(&rule.at_or_below),
            Err(_) => Decision::Unparsable,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub keyword: usize,
    pub above: usize,
    pub at_or_below: usize,
    pub no_rule: usize,
    pub unparsable: usize,
}

impl ClassificationReport {
    pub fn unlabeled(&self) -> usize {
        self.no_rule + self.unparsable
    }
}

/// Writes one label per row into `label_column`, creating it when absent.
pub fn classify_dataset(
    dataset: &mut Dataset,
    rules: &RuleSet,
    label_column: &str,
) -> ClassificationReport {
    let label_idx = dataset.ensure_column(label_column);
    let bound = rules.bind(dataset.headers());
    let mut report = ClassificationReport::default();
    let mut labels = Vec::with_capacity(dataset.len());
    for row in dataset.rows() {
        let decision = bound.classify(row);
        match decision {
            Decision::Keyword(_) => report.keyword += 1,
            Decision::Above(_) => report.above += 1,
            Decision::AtOrBelow(_) => report.at_or_below += 1,
            Decision::NoCategoryRule => report.no_rule += 1,
            Decision::Unparsable => report.unparsable += 1,
        }
        labels.push(decision.label().to_string());
    }
    for (row, label) in labels.into_iter().enumerate() {
        dataset.set_cell(row, label_idx, label);
    }

    info!(
        "Classified {} row(s) into '{}': {} keyword, {} above, {} at-or-below, {} unlabeled",
        dataset.len(),
        label_column,
        report.keyword,
        report.above,
        report.at_or_below,
        report.unlabeled()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(category: &str, limit: i64) -> ClassificationRule {
        ClassificationRule::Threshold(ThresholdRule {
            category: category.into(),
            column: "Age".into(),
            threshold: limit,
            above: "Out of SLO".into(),
            at_or_below: "Ignore".into(),
            always_above: false,
        })
    }

    #[test]
    fn duplicate_categories_are_rejected_after_normalization() {
        let err = RuleSet::new("Severity", &[threshold("High", 60), threshold(" high ", 90)])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateCategory {
                category: " high ".into()
            }
        );
    }

    #[test]
    fn empty_keyword_is_rejected() {
        let rule = ClassificationRule::Keyword(KeywordOverrideRule {
            column: "Status".into(),
            keyword: String::new(),
            value: "EOL".into(),
        });
        assert!(matches!(
            RuleSet::new("Severity", &[rule]),
            Err(ConfigError::EmptyKeyword { .. })
        ));
    }

    #[test]
    fn keyword_rules_sort_ahead_of_thresholds() {
        let keyword = ClassificationRule::Keyword(KeywordOverrideRule {
            column: "Status".into(),
            keyword: "outdated".into(),
            value: "EOL".into(),
        });
        let rules = RuleSet::new("Severity", &[threshold("Low", 0), keyword]).unwrap();
        let headers: Vec<String> = ["Status", "Severity", "Age"].map(String::from).to_vec();
        let bound = rules.bind(&headers);
        let row: Vec<String> = ["OUTDATED os", "Low", "500"].map(String::from).to_vec();
        assert_eq!(bound.classify(&row), Decision::Keyword("EOL"));
    }
}
