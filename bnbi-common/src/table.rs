//! Untyped tabular structure returned by record sources
//!
//! Both backends hand the pipeline the same shape: ordered column names plus
//! one row of JSON scalars per listing. Column order matters because the
//! amenity block can be declared positionally.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

static NULL: Value = Value::Null;

/// Raw listing table (one row per record, cells untyped)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Column names in source order
    pub columns: Vec<String>,
    /// Row-major cell values; every row has `columns.len()` cells
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Flatten documents into a table
    ///
    /// Columns are the union of document keys in first-seen order. A key
    /// absent from a document reads as null in that row.
    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let documents: Vec<Map<String, Value>> = documents.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for doc in &documents {
            for key in doc.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = documents
            .into_iter()
            .map(|doc| {
                let mut row = vec![Value::Null; columns.len()];
                for (key, value) in doc {
                    if let Some(&i) = index.get(&key) {
                        row[i] = value;
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Append a row, padding with nulls or truncating to the column count
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column index); out-of-range reads as null
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL)
    }
}
