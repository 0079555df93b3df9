//! Value format checks.
//!
//! Ontology-backed columns hold `NT=<name>;AC=<accession>`, optionally
//! followed by further `KEY=value` pairs (`TA=`, `MT=`, `PP=` in
//! modification parameters). Free-text columns must be non-empty.

use std::sync::LazyLock;

use regex::Regex;
use sdrf_model::{ColumnFormat, MetadataColumn, column_format};

use crate::issue::Issue;

static ONTOLOGY_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^NT=[^;=]+;AC=[^;=]+(;[A-Z]{2}=[^;]*)*$").expect("Invalid ontology value regex")
});

pub fn is_ontology_value(value: &str) -> bool {
    ONTOLOGY_VALUE_REGEX.is_match(value.trim())
}

pub fn check(columns: &[MetadataColumn]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for column in columns {
        let name = column.name.trim().to_string();
        match column_format(&column.name) {
            None => issues.push(Issue::UnrecognizedColumn { column: name }),
            Some(ColumnFormat::Ontology) if !is_ontology_value(&column.value) => {
                issues.push(Issue::OntologyFormat {
                    column: name,
                    value: column.value.clone(),
                });
            }
            Some(ColumnFormat::FreeText) if column.value.trim().is_empty() => {
                issues.push(Issue::EmptyValue { column: name });
            }
            Some(_) => {}
        }
    }
    issues
}
