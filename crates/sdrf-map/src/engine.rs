//! Term matcher.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use sdrf_model::{
    AnnotatorError, ExtractedTerm, MatchResult, MatchType, OntologyEntry, OntologyType, Result,
};
use sdrf_ontology::IndexSnapshot;

use crate::score::{Strategy, StrategyScore};

/// Terms shorter than this (normalized, in characters) only match exactly.
pub const MIN_FUZZY_TERM_CHARS: usize = 3;

/// Confidence level categories for match quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Below the high-confidence threshold; worth a manual look.
    Low,
    /// At or above the high-confidence threshold.
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Matcher thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Results below this are dropped (default: 0.5).
    pub min_confidence: f64,
    /// Splits strong from weak suggestions; never filters (default: 0.8).
    pub high_confidence_threshold: f64,
    /// Fuzzy similarities below this are discarded (default: 0.5).
    pub fuzzy_floor: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            high_confidence_threshold: 0.8,
            fuzzy_floor: 0.5,
        }
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_confidence", self.min_confidence),
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("fuzzy_floor", self.fuzzy_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnnotatorError::configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Categorizes a confidence score.
    #[must_use]
    pub fn level(&self, confidence: f64) -> ConfidenceLevel {
        if confidence >= self.high_confidence_threshold {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// A scored entry before reduction.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    entry: &'a OntologyEntry,
    score: StrategyScore,
}

/// Orders candidates best first: confidence, strategy priority, length
/// difference, then accession.
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .confidence
        .total_cmp(&a.score.confidence)
        .then_with(|| {
            a.score
                .match_type
                .priority()
                .cmp(&b.score.match_type.priority())
        })
        .then_with(|| a.score.length_diff.cmp(&b.score.length_diff))
        .then_with(|| a.entry.accession.cmp(&b.entry.accession))
}

/// Orders final results: confidence desc, match type, ontology type, accession.
pub fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.match_type.priority().cmp(&b.match_type.priority()))
        .then_with(|| a.entry.ontology_type.cmp(&b.entry.ontology_type))
        .then_with(|| a.entry.accession.cmp(&b.entry.accession))
        .then_with(|| a.term.position.cmp(&b.term.position))
}

/// Scores extracted terms against an ontology index snapshot.
///
/// For each (term, ontology type) only the top-ranked candidate survives;
/// the confidence threshold is applied after that reduction, so raising the
/// threshold only ever removes results.
#[derive(Debug, Clone, Default)]
pub struct TermMatcher {
    options: MatchOptions,
}

impl TermMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Matches one term using the configured `min_confidence`.
    pub fn match_term(
        &self,
        snapshot: &IndexSnapshot,
        term: &ExtractedTerm,
        ontology_types: &[OntologyType],
    ) -> Result<Vec<MatchResult>> {
        self.match_term_with(snapshot, term, ontology_types, self.options.min_confidence)
    }

    /// Matches one term against each requested ontology type (all when empty).
    ///
    /// Returns at most one result per type, highest confidence first.
    pub fn match_term_with(
        &self,
        snapshot: &IndexSnapshot,
        term: &ExtractedTerm,
        ontology_types: &[OntologyType],
        min_confidence: f64,
    ) -> Result<Vec<MatchResult>> {
        check_threshold(min_confidence)?;
        let types: &[OntologyType] = if ontology_types.is_empty() {
            &OntologyType::ALL
        } else {
            ontology_types
        };

        let mut results = Vec::new();
        for ontology_type in types {
            let Some(best) = self.best_candidate(snapshot, term, *ontology_type) else {
                continue;
            };
            if best.score.confidence < min_confidence {
                continue;
            }
            results.push(MatchResult::new(
                term.clone(),
                best.entry.clone(),
                best.score.confidence,
                best.score.match_type,
            )?);
        }
        results.sort_by(compare_results);
        Ok(results)
    }

    /// Matches many terms, flattening and ordering the results.
    pub fn match_terms(
        &self,
        snapshot: &IndexSnapshot,
        terms: &[ExtractedTerm],
        ontology_types: &[OntologyType],
        min_confidence: f64,
    ) -> Result<Vec<MatchResult>> {
        let mut results = Vec::new();
        for term in terms {
            results.extend(self.match_term_with(snapshot, term, ontology_types, min_confidence)?);
        }
        results.sort_by(compare_results);
        Ok(results)
    }

    fn best_candidate<'a>(
        &self,
        snapshot: &'a IndexSnapshot,
        term: &ExtractedTerm,
        ontology_type: OntologyType,
    ) -> Option<Candidate<'a>> {
        let normalized = term.normalized_text.as_str();
        if normalized.is_empty() {
            return None;
        }

        // An exact hit always outranks partial and fuzzy candidates.
        if let Some(entry) = snapshot.lookup_exact(normalized, ontology_type) {
            return Some(Candidate {
                entry,
                score: StrategyScore {
                    confidence: 1.0,
                    match_type: MatchType::Exact,
                    length_diff: 0,
                },
            });
        }
        if normalized.chars().count() < MIN_FUZZY_TERM_CHARS {
            return None;
        }

        let [_, partial, fuzzy] = Strategy::pipeline(self.options.fuzzy_floor);
        let mut best: Option<Candidate<'a>> = None;
        for indexed in snapshot.candidates(ontology_type) {
            for strategy in [partial, fuzzy] {
                let Some(score) = strategy.score(normalized, indexed) else {
                    continue;
                };
                let candidate = Candidate {
                    entry: &indexed.entry,
                    score,
                };
                let replace = best
                    .as_ref()
                    .is_none_or(|current| rank(&candidate, current) == Ordering::Less);
                if replace {
                    best = Some(candidate);
                }
            }
        }
        if let Some(found) = &best {
            trace!(
                term = %term.text_span,
                %ontology_type,
                accession = %found.entry.accession,
                confidence = found.score.confidence,
                match_type = %found.score.match_type,
                "best candidate"
            );
        }
        best
    }
}

fn check_threshold(min_confidence: f64) -> Result<()> {
    if (0.0..=1.0).contains(&min_confidence) {
        Ok(())
    } else {
        Err(AnnotatorError::validation(format!(
            "min_confidence must be within [0, 1], got {min_confidence}"
        )))
    }
}

/// Counts results per confidence level.
pub fn count_by_level(
    results: &[MatchResult],
    options: &MatchOptions,
) -> BTreeMap<ConfidenceLevel, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(options.level(result.confidence)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: Vec<OntologyEntry>) -> IndexSnapshot {
        IndexSnapshot::build(entries, 1).unwrap()
    }

    #[test]
    fn exact_beats_everything() {
        let snapshot = snapshot(vec![
            OntologyEntry::new(1, OntologyType::Tissue, "liver", "UBERON:0002107"),
            OntologyEntry::new(2, OntologyType::Tissue, "liver lobe", "UBERON:0001113"),
        ]);
        let matcher = TermMatcher::default();
        let term = ExtractedTerm::standalone("Liver", 0);
        let results = matcher.match_term(&snapshot, &term, &[OntologyType::Tissue]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Exact);
        assert_eq!(results[0].confidence, 1.0);
        assert_eq!(results[0].entry.accession, "UBERON:0002107");
    }

    #[test]
    fn equal_confidence_prefers_smaller_accession() {
        let snapshot = snapshot(vec![
            OntologyEntry::new(1, OntologyType::Disease, "breast fibroma", "DOID:9"),
            OntologyEntry::new(2, OntologyType::Disease, "breast adenoma", "DOID:1"),
        ]);
        let matcher = TermMatcher::default();
        let term = ExtractedTerm::standalone("breast", 0);
        let results = matcher.match_term(&snapshot, &term, &[]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.accession, "DOID:1");
    }

    #[test]
    fn equal_confidence_prefers_closer_length() {
        // Both names are 0.8 Indel-similar to the term: one by two
        // substitutions at the same length, one by five inserted letters.
        let snapshot = snapshot(vec![
            OntologyEntry::new(
                1,
                OntologyType::SubcellularLocation,
                "hepatoblastcyte",
                "GO:0000001",
            ),
            OntologyEntry::new(2, OntologyType::SubcellularLocation, "hepatacyta", "GO:0000009"),
        ]);
        let matcher = TermMatcher::default();
        let term = ExtractedTerm::standalone("hepatocyte", 0);
        let results = matcher
            .match_term(&snapshot, &term, &[OntologyType::SubcellularLocation])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Fuzzy);
        assert!((results[0].confidence - 0.8).abs() < 1e-9);
        assert_eq!(results[0].entry.accession, "GO:0000009");
    }

    #[test]
    fn word_fragments_do_not_match() {
        let snapshot = snapshot(vec![
            OntologyEntry::new(1, OntologyType::Species, "Rattus norvegicus", "NCBITaxon:10116")
                .with_synonyms(["rat"]),
        ]);
        let matcher = TermMatcher::default();
        for word in ["separation", "concentration"] {
            let term = ExtractedTerm::standalone(word, 0);
            assert!(matcher.match_term(&snapshot, &term, &[]).unwrap().is_empty());
        }
        let term = ExtractedTerm::standalone("rat", 0);
        assert_eq!(matcher.match_term(&snapshot, &term, &[]).unwrap().len(), 1);
    }

    #[test]
    fn short_terms_only_match_exactly() {
        let snapshot = snapshot(vec![OntologyEntry::new(
            1,
            OntologyType::MsVocabulary,
            "MS",
            "MS:0000000",
        )]);
        let matcher = TermMatcher::default();
        let hit = ExtractedTerm::standalone("ms", 0);
        assert_eq!(matcher.match_term(&snapshot, &hit, &[]).unwrap().len(), 1);
        let miss = ExtractedTerm::standalone("mz", 0);
        assert!(matcher.match_term(&snapshot, &miss, &[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let snapshot = snapshot(vec![OntologyEntry::new(
            1,
            OntologyType::Tissue,
            "liver",
            "UBERON:0002107",
        )]);
        let term = ExtractedTerm::standalone("liver", 0);
        let error = TermMatcher::default()
            .match_term_with(&snapshot, &term, &[], 1.5)
            .unwrap_err();
        assert_eq!(error.error_type(), "validation_error");
    }

    #[test]
    fn levels_split_on_high_threshold() {
        let options = MatchOptions::default();
        assert_eq!(options.level(0.8), ConfidenceLevel::High);
        assert_eq!(options.level(0.79), ConfidenceLevel::Low);
    }
}
