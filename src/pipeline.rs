//! The enrichment pipeline: projection, injection, lookups, age, classification
//! and remapping, in that fixed order, over one in-memory dataset.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;

use crate::{
    classify::{ClassificationReport, RuleSet, classify_dataset},
    config::PipelineConfig,
    dataset::Dataset,
    error::ConfigError,
    inject::inject_columns,
    lookup::{LookupOutcome, ReferenceSource, run_lookups},
    projection::{ProjectionReport, project},
    remap::{RemapReport, RemapTable, remap_column},
    report,
    temporal::{AgeReport, compute_age},
};

/// A validated configuration ready to run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    rules: Option<RuleSet>,
    remap_table: Option<RemapTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub projection: ProjectionReport,
    pub age: Option<AgeReport>,
    pub classification: Option<ClassificationReport>,
    pub remap: Option<RemapReport>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dataset: Dataset,
    /// Rows that missed any lookup, as they stood right after the lookup stage.
    pub unmatched: Dataset,
    pub summary: Dataset,
    pub lookups: LookupOutcome,
    pub report: RunReport,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config
            .classification
            .as_ref()
            .map(|c| c.rule_set())
            .transpose()?;
        let remap_table = config.remap.as_ref().map(|r| r.table());
        Ok(Self {
            config,
            rules,
            remap_table,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn rules(&self) -> Option<&RuleSet> {
        self.rules.as_ref()
    }

    /// Runs every configured stage against `input`. Only an unreadable
    /// reference table fails the run; every other missing input degrades the
    /// affected stage and is logged.
    pub fn run(
        &self,
        input: &Dataset,
        references: &dyn ReferenceSource,
        today: NaiveDate,
    ) -> Result<PipelineOutput> {
        let config = &self.config;
        let mut run_report = RunReport {
            input_rows: input.len(),
            ..RunReport::default()
        };

        let (mut dataset, projection) =
            project(input, &config.columns, config.drop_empty_rows);
        run_report.projection = projection;

        inject_columns(&mut dataset, &config.inject, config.inject_position);

        let lookups = run_lookups(
            &mut dataset,
            &config.lookups,
            references,
            &config.unmatched_placeholder,
        )
        .context("Running lookups")?;
        let unmatched = report::unmatched_rows(&dataset, &lookups.unmatched);

        if let Some(age) = &config.age {
            run_report.age = Some(compute_age(&mut dataset, age, today));
        }

        if let (Some(classification), Some(rules)) = (&config.classification, &self.rules) {
            run_report.classification = Some(classify_dataset(
                &mut dataset,
                rules,
                &classification.label_column,
            ));
        }

        if let (Some(remap), Some(table)) = (&config.remap, &self.remap_table) {
            run_report.remap = Some(remap_column(
                &mut dataset,
                &remap.source_column,
                remap.target(),
                table,
            ));
        }

        run_report.output_rows = dataset.len();
        let summary = report::summary_dataset(&lookups.summaries);
        info!(
            "Pipeline finished: {} of {} row(s) kept, {} row(s) missed a lookup",
            run_report.output_rows,
            run_report.input_rows,
            lookups.unmatched.len()
        );

        Ok(PipelineOutput {
            dataset,
            unmatched,
            summary,
            lookups,
            report: run_report,
        })
    }
}
