//! Reporting projections over state the pipeline already computed.

use std::collections::BTreeSet;

use crate::{
    dataset::Dataset,
    lookup::{LookupStatus, LookupSummary},
};

pub const SUMMARY_HEADERS: [&str; 6] = [
    "Target Column",
    "Match Column",
    "Reference",
    "Matched Rows",
    "Unmatched Rows",
    "Status",
];

/// Rows at the given positions, ascending, with the full column set.
pub fn unmatched_rows(dataset: &Dataset, positions: &BTreeSet<usize>) -> Dataset {
    dataset.select_rows(positions.iter().copied())
}

/// One row per lookup spec.
pub fn summary_dataset(summaries: &[LookupSummary]) -> Dataset {
    let mut dataset = Dataset::new(SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect());
    for summary in summaries {
        let status = match &summary.status {
            LookupStatus::Applied => "applied".to_string(),
            LookupStatus::Skipped(reason) => format!("skipped: {reason}"),
        };
        dataset.push_row(vec![
            summary.target_column.clone(),
            summary.match_column.clone(),
            summary.reference.clone(),
            summary.matched.to_string(),
            summary.unmatched.to_string(),
            status,
        ]);
    }
    dataset
}
