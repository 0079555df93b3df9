use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Result of checking a column set against the required-column policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub missing_columns: BTreeSet<String>,
    pub invalid_columns: BTreeSet<String>,
    /// One remediation line per missing or invalid column.
    pub suggestions: Vec<String>,
}

impl ComplianceReport {
    /// Builds a report; `compliant` is derived from the two gap sets.
    pub fn new(
        missing_columns: BTreeSet<String>,
        invalid_columns: BTreeSet<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            compliant: missing_columns.is_empty() && invalid_columns.is_empty(),
            missing_columns,
            invalid_columns,
            suggestions,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.missing_columns.len() + self.invalid_columns.len()
    }
}
