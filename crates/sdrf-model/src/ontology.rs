//! Ontology vocabulary model.
//!
//! An [`OntologyEntry`] is one curated term (species, tissue, instrument, ...)
//! with its accession and synonyms. Entries are immutable once handed to the
//! ontology index.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;

/// The curated vocabularies terms are matched against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OntologyType {
    Species,
    Tissue,
    Disease,
    SubcellularLocation,
    MsVocabulary,
    Modification,
}

impl OntologyType {
    /// All ontology types in canonical order.
    pub const ALL: [OntologyType; 6] = [
        Self::Species,
        Self::Tissue,
        Self::Disease,
        Self::SubcellularLocation,
        Self::MsVocabulary,
        Self::Modification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Tissue => "tissue",
            Self::Disease => "disease",
            Self::SubcellularLocation => "subcellular_location",
            Self::MsVocabulary => "ms_vocabulary",
            Self::Modification => "modification",
        }
    }

    /// Parses a list of ontology type names; an empty list means "all types".
    pub fn parse_list<S: AsRef<str>>(raw: &[S]) -> Result<Vec<OntologyType>, AnnotatorError> {
        if raw.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        let mut types = Vec::with_capacity(raw.len());
        for value in raw {
            let parsed: OntologyType = value.as_ref().parse()?;
            if !types.contains(&parsed) {
                types.push(parsed);
            }
        }
        Ok(types)
    }
}

impl FromStr for OntologyType {
    type Err = AnnotatorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "species" | "organism" => Ok(Self::Species),
            "tissue" | "organism_part" => Ok(Self::Tissue),
            "disease" => Ok(Self::Disease),
            "subcellular_location" | "subcellular" => Ok(Self::SubcellularLocation),
            "ms_vocabulary" | "ms" | "ms_term" => Ok(Self::MsVocabulary),
            "modification" | "unimod" => Ok(Self::Modification),
            _ => Err(AnnotatorError::validation(format!(
                "unknown ontology type '{}'",
                raw.trim()
            ))),
        }
    }
}

impl fmt::Display for OntologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single curated vocabulary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyEntry {
    /// Record id from the vocabulary provider.
    pub id: u64,
    pub ontology_type: OntologyType,
    pub canonical_name: String,
    /// Accession, e.g. `NCBITaxon:10090` or `UNIMOD:35`.
    pub accession: String,
    #[serde(default)]
    pub synonyms: BTreeSet<String>,
    /// Sub-category for MS vocabulary terms ("instrument", "cleavage agent", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl OntologyEntry {
    pub fn new(
        id: u64,
        ontology_type: OntologyType,
        canonical_name: impl Into<String>,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            id,
            ontology_type,
            canonical_name: canonical_name.into(),
            accession: accession.into(),
            synonyms: BTreeSet::new(),
            category: None,
        }
    }

    #[must_use]
    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms.extend(synonyms.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Canonical name followed by every synonym.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }

    /// SDRF cell value: `NT=<name>;AC=<accession>`.
    pub fn sdrf_value(&self) -> String {
        format!("NT={};AC={}", self.canonical_name, self.accession)
    }
}
