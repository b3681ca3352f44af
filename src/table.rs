use std::fmt::Write as _;

use crate::dataset::Dataset;

/// Renders headers and rows as left-aligned, two-space separated columns with
/// a dashed rule under the header. Widths count characters, not bytes.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let mut output = String::new();
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

/// Renders at most `limit` rows of `dataset`.
pub fn render_dataset(dataset: &Dataset, limit: usize) -> String {
    let shown = dataset.len().min(limit);
    render_table(dataset.headers(), &dataset.rows()[..shown])
}

pub fn print_dataset(dataset: &Dataset, limit: usize) {
    print!("{}", render_dataset(dataset, limit));
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, &width)| {
            let text = flatten(cells.get(idx).map(String::as_str).unwrap_or(""));
            format!("{text:<width$}")
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
