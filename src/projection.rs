use log::{info, warn};

use crate::dataset::Dataset;
use crate::data::is_blank;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    /// Requested columns that the source did not contain.
    pub missing_columns: Vec<String>,
    pub rows_dropped: usize,
}

/// Keeps the requested columns that exist in `dataset`, in the requested order.
///
/// An empty `columns` list keeps every source column. When `drop_empty_rows`
/// is set, rows whose retained cells are all blank are removed; this is the
/// only place in the pipeline where the row count can shrink.
pub fn project(
    dataset: &Dataset,
    columns: &[String],
    drop_empty_rows: bool,
) -> (Dataset, ProjectionReport) {
    let mut report = ProjectionReport::default();
    let mut indices = Vec::with_capacity(columns.len());

    let mut projected = if columns.is_empty() {
        dataset.clone()
    } else {
        for name in columns {
            match dataset.column_index(name) {
                Some(idx) if !indices.contains(&idx) => indices.push(idx),
                Some(_) => {}
                None => report.missing_columns.push(name.clone()),
            }
        }
        dataset.select_columns(&indices)
    };

    if !report.missing_columns.is_empty() {
        warn!(
            "Requested column(s) not present and skipped: {}",
            report.missing_columns.join(", ")
        );
    }

    if drop_empty_rows {
        report.rows_dropped = projected.retain_rows(|row| !row.iter().all(|cell| is_blank(cell)));
        info!("Dropped {} empty row(s)", report.rows_dropped);
    }

    info!(
        "Projected {} column(s) across {} row(s)",
        projected.headers().len(),
        projected.len()
    );
    (projected, report)
}
