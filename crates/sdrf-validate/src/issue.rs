//! Compliance issue types.
//!
//! Each variant carries only the data its remediation line needs.

use serde::{Deserialize, Serialize};

/// A single compliance gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Issue {
    /// A required column is absent.
    RequiredMissing { column: String },
    /// An ontology-backed column does not hold `NT=<name>;AC=<accession>`.
    OntologyFormat { column: String, value: String },
    /// A free-text column is empty.
    EmptyValue { column: String },
    /// The column name is not part of the SDRF vocabulary.
    UnrecognizedColumn { column: String },
}

impl Issue {
    /// Column name (all issues have one).
    pub fn column(&self) -> &str {
        match self {
            Self::RequiredMissing { column }
            | Self::OntologyFormat { column, .. }
            | Self::EmptyValue { column }
            | Self::UnrecognizedColumn { column } => column,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::RequiredMissing { .. })
    }

    /// Human-readable remediation line.
    ///
    /// `candidate` is a value the term matcher proposed for this column.
    pub fn suggestion(&self, candidate: Option<&str>) -> String {
        let hint = match candidate {
            Some(value) => format!(" (matcher candidate: {value})"),
            None => String::new(),
        };
        match self {
            Self::RequiredMissing { column } => match candidate {
                Some(value) => format!("add required column '{column}' with value '{value}'"),
                None => format!(
                    "add required column '{column}'; no candidate value was found in the step text"
                ),
            },
            Self::OntologyFormat { column, value } => format!(
                "set '{column}' to the form NT=<name>;AC=<accession> instead of '{value}'{hint}"
            ),
            Self::EmptyValue { column } => format!("fill in a value for '{column}'{hint}"),
            Self::UnrecognizedColumn { column } => {
                format!("rename or remove '{column}'; it is not a recognized SDRF column")
            }
        }
    }
}
