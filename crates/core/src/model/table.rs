use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::raw::RawDataset;

/// Suffix marking a column (or table) as computed rather than logged.
pub const DERIVED_MARKER: char = '*';

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column `{0}` already exists")]
    Duplicate(String),
    #[error("column `{name}` has {got} rows, index has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// One (topic, instance) table: a time index in seconds plus named columns of
/// equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicTable {
    index: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl TopicTable {
    /// An empty table sharing `index` with some other table.
    pub fn with_index(index: Vec<f64>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    /// Convert a raw dataset: µs timestamps become the seconds index, raw
    /// columns are moved in untouched.
    pub fn from_raw(dataset: RawDataset) -> Self {
        Self {
            index: dataset.timestamps.iter().map(|&t| t as f64 / 1e6).collect(),
            columns: dataset.columns,
        }
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Append a computed column. Existing columns are never replaced.
    pub fn insert_derived(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), TableError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(TableError::Duplicate(name));
        }
        if values.len() != self.index.len() {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.index.len(),
                got: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }
}

pub fn is_derived(name: &str) -> bool {
    name.contains(DERIVED_MARKER) || name.ends_with("^0.5")
}
