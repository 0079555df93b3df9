//! Extracted terms and match results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;
use crate::ontology::OntologyEntry;

/// A candidate term span pulled out of protocol text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTerm {
    /// The span as it appears in the text (tokens joined by single spaces).
    pub text_span: String,
    pub normalized_text: String,
    /// Surrounding tokens used for disambiguation.
    pub context_window: String,
    /// Token index of the first token of the span.
    pub position: usize,
}

impl ExtractedTerm {
    /// Builds a term from a standalone string (no surrounding text).
    pub fn standalone(text: &str, position: usize) -> Self {
        Self {
            text_span: text.trim().to_string(),
            normalized_text: crate::text::normalize_text(text),
            context_window: text.trim().to_string(),
            position,
        }
    }
}

/// The strategy that produced a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
    Fuzzy,
}

impl MatchType {
    /// Tie-break priority; lower wins.
    pub fn priority(self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Partial => 1,
            Self::Fuzzy => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Partial => "partial",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored pairing of an extracted term with an ontology entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub term: ExtractedTerm,
    pub entry: OntologyEntry,
    pub confidence: f64,
    pub match_type: MatchType,
}

impl MatchResult {
    /// Creates a match, enforcing the confidence invariants.
    ///
    /// Confidence must lie in `[0, 1]`, and exact matches must carry exactly 1.0.
    pub fn new(
        term: ExtractedTerm,
        entry: OntologyEntry,
        confidence: f64,
        match_type: MatchType,
    ) -> Result<Self, AnnotatorError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AnnotatorError::Matching(format!(
                "confidence {confidence} for '{}' -> {} is outside [0, 1]",
                term.text_span, entry.accession
            )));
        }
        if match_type == MatchType::Exact && confidence != 1.0 {
            return Err(AnnotatorError::Matching(format!(
                "exact match '{}' -> {} has confidence {confidence}",
                term.text_span, entry.accession
            )));
        }
        Ok(Self {
            term,
            entry,
            confidence,
            match_type,
        })
    }
}
