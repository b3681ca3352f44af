use log::info;
use serde::{Deserialize, Serialize};

use crate::{data::Value, dataset::Dataset};

/// A column written with one constant value on every row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ColumnDefault {
    pub name: String,
    /// Omitted means a blank column.
    #[serde(default)]
    pub value: Value,
}

impl ColumnDefault {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::default(),
        }
    }
}

/// Where newly created columns land relative to the existing ones.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InjectPosition {
    #[default]
    Front,
    Back,
}

/// Writes each default into its column on every row, overwriting whatever was
/// there. New columns keep their configured order as a block at the front or
/// back; columns that already exist stay where they are.
pub fn inject_columns(dataset: &mut Dataset, columns: &[ColumnDefault], position: InjectPosition) {
    let mut next_front = 0usize;
    for column in columns {
        let idx = match (dataset.column_index(&column.name), position) {
            (Some(idx), _) => idx,
            (None, InjectPosition::Front) => {
                let idx = dataset.insert_column(next_front, &column.name);
                next_front += 1;
                idx
            }
            (None, InjectPosition::Back) => dataset.ensure_column(&column.name),
        };
        let rendered = column.value.as_display();
        dataset.fill_column(idx, &rendered);
        if rendered.is_empty() {
            info!("Column '{}' left blank", column.name);
        } else {
            info!("Column '{}' set to '{}'", column.name, rendered);
        }
    }
}
