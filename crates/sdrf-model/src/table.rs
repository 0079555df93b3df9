use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;

/// A rectangular SDRF table: unique ordered headers, one map per row.
///
/// Every row holds a value for every header; absent cells are stored as
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdrfTable {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl SdrfTable {
    pub fn new(headers: Vec<String>) -> Result<Self, AnnotatorError> {
        let mut seen = BTreeSet::new();
        for header in &headers {
            if header.trim().is_empty() {
                return Err(AnnotatorError::validation("SDRF header must not be empty"));
            }
            if !seen.insert(header.as_str()) {
                return Err(AnnotatorError::validation(format!(
                    "duplicate SDRF header '{header}'"
                )));
            }
        }
        Ok(Self {
            headers,
            rows: Vec::new(),
        })
    }

    /// Appends a row, filling missing cells with empty strings.
    pub fn push_row(&mut self, mut cells: BTreeMap<String, String>) -> Result<(), AnnotatorError> {
        if let Some(unknown) = cells.keys().find(|key| !self.headers.contains(key)) {
            return Err(AnnotatorError::validation(format!(
                "row references unknown column '{unknown}'"
            )));
        }
        for header in &self.headers {
            cells.entry(header.clone()).or_default();
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        self.rows.get(row)?.get(header).map(String::as_str)
    }

    /// Row values in header order.
    pub fn row_values(&self, row: usize) -> Option<Vec<&str>> {
        let cells = self.rows.get(row)?;
        Some(
            self.headers
                .iter()
                .map(|header| cells.get(header).map_or("", String::as_str))
                .collect(),
        )
    }

    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| {
            row.len() == self.headers.len() && self.headers.iter().all(|h| row.contains_key(h))
        })
    }
}
