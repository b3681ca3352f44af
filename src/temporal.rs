use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{data::parse_calendar_day, dataset::Dataset};

/// Derives a whole-day age column from a date column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AgeColumn {
    pub date_column: String,
    pub target_column: String,
    /// Rewrite parsed dates in place as `YYYY-MM-DD`.
    #[serde(default = "AgeColumn::default_normalize")]
    pub normalize_dates: bool,
    /// Read ambiguous slash dates as day/month instead of month/day.
    #[serde(default)]
    pub day_first: bool,
}

impl AgeColumn {
    const fn default_normalize() -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeReport {
    pub parsed: usize,
    pub unparsed: usize,
}

/// Whole days from `date` to `today`; negative when `date` is in the future.
pub fn days_between(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

/// Writes `today − date` in days into the target column. Blank or unparsable
/// dates write an empty cell, never `0`.
pub fn compute_age(dataset: &mut Dataset, config: &AgeColumn, today: NaiveDate) -> AgeReport {
    let target_idx = dataset.ensure_column(&config.target_column);
    let Some(date_idx) = dataset.column_index(&config.date_column) else {
        warn!(
            "Date column '{}' not found; '{}' left empty",
            config.date_column, config.target_column
        );
        dataset.fill_column(target_idx, "");
        return AgeReport {
            parsed: 0,
            unparsed: dataset.len(),
        };
    };

    let mut report = AgeReport::default();
    dataset.for_each_row_mut(|_, row| {
        let parsed = row
            .get(date_idx)
            .and_then(|raw| parse_calendar_day(raw, config.day_first));
        match parsed {
            Some(date) => {
                report.parsed += 1;
                if config.normalize_dates
                    && let Some(cell) = row.get_mut(date_idx)
                {
                    *cell = date.format("%Y-%m-%d").to_string();
                }
                if let Some(cell) = row.get_mut(target_idx) {
                    *cell = days_between(date, today).to_string();
                }
            }
            None => {
                report.unparsed += 1;
                if let Some(cell) = row.get_mut(target_idx) {
                    cell.clear();
                }
            }
        }
    });

    if report.unparsed > 0 {
        warn!(
            "{} row(s) had a missing or unparsable '{}'; '{}' left empty",
            report.unparsed, config.date_column, config.target_column
        );
    }
    info!(
        "Computed '{}' for {} row(s) as of {}",
        config.target_column, report.parsed, today
    );
    report
}
