//! In-memory tabular dataset threaded through every enrichment stage.
//!
//! A [`Dataset`] is an ordered header list plus rows of untyped string cells.
//! All rows share the header list; stages mutate cells in place and never
//! reorder rows. An empty string is the "empty" scalar.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;

use crate::io_utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset from raw rows, padding short rows with empty cells and
    /// truncating long ones so every row matches the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(|row| row.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Returns the cell at `(row, column)`, or `None` when either is out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
    }

    /// Looks up a cell by column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.cell(row, idx)
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value.into();
        }
    }

    /// Returns the index of `name`, appending a blank column when it is absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Inserts a blank column at `position` (clamped to the width) when absent.
    pub fn insert_column(&mut self, position: usize, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        let position = position.min(self.headers.len());
        self.headers.insert(position, name.to_string());
        for row in &mut self.rows {
            row.insert(position, String::new());
        }
        position
    }

    /// Sets every row's value of column `column` to `value`.
    pub fn fill_column(&mut self, column: usize, value: &str) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                cell.clear();
                cell.push_str(value);
            }
        }
    }

    /// Applies `f` to every row, handing it the row position and a mutable row.
    pub fn for_each_row_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, &mut [String]),
    {
        for (idx, row) in self.rows.iter_mut().enumerate() {
            f(idx, row.as_mut_slice());
        }
    }

    /// Keeps only the rows for which `keep` returns true, preserving order.
    /// Returns the number of rows removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[String]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Returns a new dataset containing the rows at `positions`, in the order given.
    /// Positions outside the dataset are ignored.
    pub fn select_rows<I>(&self, positions: I) -> Dataset
    where
        I: IntoIterator<Item = usize>,
    {
        let rows = positions
            .into_iter()
            .filter_map(|idx| self.rows.get(idx).cloned())
            .collect();
        Dataset {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Returns a new dataset made of the given column indices, in that order.
    pub fn select_columns(&self, indices: &[usize]) -> Dataset {
        let headers = indices
            .iter()
            .filter_map(|idx| self.headers.get(*idx).cloned())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .filter_map(|idx| row.get(*idx).cloned())
                    .collect()
            })
            .collect();
        Dataset { headers, rows }
    }

    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        if headers.is_empty() {
            return Err(anyhow!("Input {path:?} does not contain a header row"));
        }
        let mut dataset = Dataset::new(headers);
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record =
                record.with_context(|| format!("Reading row {} in {:?}", row_idx + 2, path))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} in {:?}", row_idx + 2, path))?;
            dataset.push_row(decoded);
        }
        Ok(dataset)
    }

    pub fn save(&self, path: &Path, delimiter: u8) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path, delimiter)?;
        writer
            .write_record(&self.headers)
            .with_context(|| format!("Writing headers to {path:?}"))?;
        for (idx, row) in self.rows.iter().enumerate() {
            writer
                .write_record(row)
                .with_context(|| format!("Writing row {} to {:?}", idx + 2, path))?;
        }
        writer
            .flush()
            .with_context(|| format!("Flushing output {path:?}"))?;
        Ok(())
    }
}
