//! SDRF column vocabulary and metadata columns.
//!
//! SDRF headers come in a small number of families (`characteristics[...]`,
//! `comment[...]`, `factor value[...]`, plus a few bare names). Repeated
//! columns carry a numeric suffix (`comment[modification parameters].1`).
//! Lookups here are case-insensitive and ignore the repeat suffix.

use serde::{Deserialize, Serialize};

use crate::term::MatchResult;

/// Expected value format of an SDRF column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    /// `NT=<name>;AC=<accession>` (optionally followed by more `KEY=value` pairs).
    Ontology,
    /// Any non-empty text.
    FreeText,
}

/// A recognized SDRF column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub format: ColumnFormat,
}

const fn spec(name: &'static str, format: ColumnFormat) -> ColumnSpec {
    ColumnSpec { name, format }
}

/// Recognized SDRF columns, in canonical header order.
pub const SDRF_COLUMNS: &[ColumnSpec] = &[
    spec("source name", ColumnFormat::FreeText),
    spec("characteristics[organism]", ColumnFormat::Ontology),
    spec("characteristics[organism part]", ColumnFormat::Ontology),
    spec("characteristics[disease]", ColumnFormat::Ontology),
    spec("characteristics[cell type]", ColumnFormat::Ontology),
    spec("characteristics[biological replicate]", ColumnFormat::FreeText),
    spec("assay name", ColumnFormat::FreeText),
    spec("technology type", ColumnFormat::FreeText),
    spec("comment[subcellular location]", ColumnFormat::Ontology),
    spec("comment[label]", ColumnFormat::Ontology),
    spec("comment[instrument]", ColumnFormat::Ontology),
    spec("comment[fragmentation method]", ColumnFormat::Ontology),
    spec("comment[cleavage agent details]", ColumnFormat::Ontology),
    spec("comment[modification parameters]", ColumnFormat::Ontology),
    spec("comment[fraction identifier]", ColumnFormat::FreeText),
    spec("comment[technical replicate]", ColumnFormat::FreeText),
    spec("comment[data file]", ColumnFormat::FreeText),
];

const FACTOR_VALUE_PREFIX: &str = "factor value[";

/// Strips the repeated-column suffix: `comment[label].2` -> `comment[label]`.
pub fn base_column_name(name: &str) -> &str {
    let trimmed = name.trim();
    if let Some((base, suffix)) = trimmed.rsplit_once('.')
        && base.ends_with(']')
        && !suffix.is_empty()
        && suffix.chars().all(|ch| ch.is_ascii_digit())
    {
        return base;
    }
    trimmed
}

/// Builds the `n`-th name of a repeated column.
///
/// The first occurrence keeps the bare name; later ones get `.1`, `.2`, ...
pub fn numbered_column(base: &str, occurrence: usize) -> String {
    if occurrence == 0 {
        base.to_string()
    } else {
        format!("{base}.{occurrence}")
    }
}

/// Looks up a column in the recognized vocabulary.
pub fn column_spec(name: &str) -> Option<&'static ColumnSpec> {
    let base = base_column_name(name).to_lowercase();
    SDRF_COLUMNS.iter().find(|spec| spec.name == base)
}

/// Expected format of a column, if the column is recognized.
pub fn column_format(name: &str) -> Option<ColumnFormat> {
    if let Some(spec) = column_spec(name) {
        return Some(spec.format);
    }
    let base = base_column_name(name).to_lowercase();
    if base.starts_with(FACTOR_VALUE_PREFIX) && base.ends_with(']') && base.len() > FACTOR_VALUE_PREFIX.len() + 1 {
        return Some(ColumnFormat::FreeText);
    }
    None
}

pub fn is_recognized_column(name: &str) -> bool {
    column_format(name).is_some()
}

/// A metadata column specification attached to a protocol step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataColumn {
    /// SDRF column key, e.g. `characteristics[organism]`.
    pub name: String,
    /// Free text or `NT=<name>;AC=<accession>`.
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_match: Option<MatchResult>,
    #[serde(default)]
    pub persisted: bool,
}

impl MetadataColumn {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            source_match: None,
            persisted: false,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: MatchResult) -> Self {
        self.source_match = Some(source);
        self
    }

    pub fn base_name(&self) -> &str {
        base_column_name(&self.name)
    }
}
