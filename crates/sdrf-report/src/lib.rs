//! SDRF table assembly and export.

#![deny(unsafe_code)]

pub mod tsv;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sdrf_model::{MetadataColumn, Result, SdrfTable};

pub use tsv::{escape_value, parse_tsv, to_tsv, unescape_value};

/// Exported SDRF: the structured table plus its literal TSV text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdrfExport {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
    pub tsv_content: String,
}

impl From<SdrfTable> for SdrfExport {
    fn from(table: SdrfTable) -> Self {
        let tsv_content = to_tsv(&table);
        Self {
            headers: table.headers,
            rows: table.rows,
            tsv_content,
        }
    }
}

/// Builds a rectangular table with one row per step.
///
/// Headers are the union of column names across all steps in first-seen
/// order. A column name repeated within one step keeps its first value.
/// When no step has any column the table is empty and has no rows.
pub fn build_table(steps: &[Vec<MetadataColumn>]) -> Result<SdrfTable> {
    let mut headers: Vec<String> = Vec::new();
    for column in steps.iter().flatten() {
        if !headers.iter().any(|header| header == &column.name) {
            headers.push(column.name.clone());
        }
    }
    let mut table = SdrfTable::new(headers)?;
    if table.headers.is_empty() {
        return Ok(table);
    }
    for columns in steps {
        let mut row = BTreeMap::new();
        for column in columns {
            row.entry(column.name.clone())
                .or_insert_with(|| column.value.clone());
        }
        table.push_row(row)?;
    }
    debug!(
        headers = table.headers.len(),
        rows = table.rows.len(),
        "SDRF table assembled"
    );
    Ok(table)
}

/// Assembles and serializes the per-step column sets.
pub fn export(steps: &[Vec<MetadataColumn>]) -> Result<SdrfExport> {
    Ok(build_table(steps)?.into())
}
