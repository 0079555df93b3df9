//! Compliance validation of SDRF metadata columns.
//!
//! A column set is compliant when every required column is present (matched
//! by base name, case-insensitively) and every present column holds a value
//! of the expected format.

#![deny(unsafe_code)]

mod checks;
mod issue;
mod util;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use sdrf_model::{
    AnnotatorError, ComplianceReport, MetadataColumn, Result, base_column_name,
    is_recognized_column,
};

pub use checks::run_all;
pub use issue::Issue;
pub use util::CaseInsensitiveSet;

/// Columns required unless configured otherwise.
pub const DEFAULT_REQUIRED_COLUMNS: &[&str] = &[
    "characteristics[organism]",
    "characteristics[organism part]",
    "characteristics[disease]",
    "comment[instrument]",
];

/// The required-column policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompliancePolicy {
    pub required_columns: Vec<String>,
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            required_columns: DEFAULT_REQUIRED_COLUMNS
                .iter()
                .map(|column| (*column).to_string())
                .collect(),
        }
    }
}

impl CompliancePolicy {
    /// Builds a policy; every entry must be a recognized SDRF column.
    pub fn new<I, S>(required_columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut columns = Vec::new();
        for column in required_columns {
            let column: String = column.into();
            let column = column.trim().to_lowercase();
            if !is_recognized_column(&column) {
                return Err(AnnotatorError::configuration(format!(
                    "required column '{column}' is not a recognized SDRF column"
                )));
            }
            if seen.insert(column.clone()) {
                columns.push(column);
            }
        }
        Ok(Self {
            required_columns: columns,
        })
    }
}

/// Validates `columns` against `policy`.
///
/// `candidates` maps a lowercase base column name to a value the matcher
/// proposed for it; suggestions quote it when present.
pub fn validate_columns(
    columns: &[MetadataColumn],
    policy: &CompliancePolicy,
    candidates: &BTreeMap<String, String>,
) -> ComplianceReport {
    let issues = run_all(columns, policy);

    let mut missing = BTreeSet::new();
    let mut invalid = BTreeSet::new();
    let mut suggestions = Vec::with_capacity(issues.len());
    for issue in &issues {
        let key = base_column_name(issue.column()).to_lowercase();
        suggestions.push(issue.suggestion(candidates.get(&key).map(String::as_str)));
        if issue.is_missing() {
            missing.insert(issue.column().to_string());
        } else {
            invalid.insert(issue.column().to_string());
        }
    }

    debug!(
        columns = columns.len(),
        missing = missing.len(),
        invalid = invalid.len(),
        "compliance checked"
    );
    ComplianceReport::new(missing, invalid, suggestions)
}
