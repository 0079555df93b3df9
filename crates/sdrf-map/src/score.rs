//! Matching strategies and their scores.
//!
//! Three strategies score a normalized term against the normalized names of
//! an ontology entry:
//!
//! - `Exact`: equal strings, confidence 1.0.
//! - `Partial`: the tokens of one string appear as a contiguous run in the
//!   other (ratio = shorter / longer in characters), or the token-set overlap
//!   is at least 0.5 (ratio = Jaccard). Containment never splits a word, so
//!   `rat` does not match inside `separation`.
//!   Confidence is `0.6 + 0.3 * ratio`.
//! - `Fuzzy`: the better of the Indel similarity and the token-sort ratio,
//!   kept only at or above the fuzzy floor.
//!
//! Non-exact scores are capped at [`NON_EXACT_CAP`] so that 1.0 always means
//! an exact match.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;

use sdrf_model::MatchType;
use sdrf_ontology::IndexedEntry;

/// Lower bound of the partial-match confidence band.
pub const PARTIAL_BAND_LOW: f64 = 0.6;
/// Upper bound of the partial-match confidence band.
pub const PARTIAL_BAND_HIGH: f64 = 0.9;
/// Minimum token-set overlap for a partial match without containment.
pub const TOKEN_OVERLAP_MIN: f64 = 0.5;
/// Ceiling for partial and fuzzy confidence.
pub const NON_EXACT_CAP: f64 = 0.99;

/// A matching strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    Exact,
    Partial,
    Fuzzy { floor: f64 },
}

/// Best score of a strategy against one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyScore {
    pub confidence: f64,
    pub match_type: MatchType,
    /// Absolute character-length difference between the term and the name
    /// that produced the score.
    pub length_diff: usize,
}

impl Strategy {
    /// Builds the fixed strategy pipeline, in priority order.
    pub fn pipeline(fuzzy_floor: f64) -> [Strategy; 3] {
        [
            Self::Exact,
            Self::Partial,
            Self::Fuzzy {
                floor: fuzzy_floor.clamp(0.0, 1.0),
            },
        ]
    }

    pub fn match_type(self) -> MatchType {
        match self {
            Self::Exact => MatchType::Exact,
            Self::Partial => MatchType::Partial,
            Self::Fuzzy { .. } => MatchType::Fuzzy,
        }
    }

    /// Scores a normalized term against a single normalized name.
    pub fn score_name(self, term: &str, name: &str) -> Option<f64> {
        if term.is_empty() || name.is_empty() {
            return None;
        }
        match self {
            Self::Exact => (term == name).then_some(1.0),
            Self::Partial => partial_ratio(term, name)
                .map(|ratio| cap(PARTIAL_BAND_LOW + (PARTIAL_BAND_HIGH - PARTIAL_BAND_LOW) * ratio)),
            Self::Fuzzy { floor } => {
                let similarity = fuzzy_similarity(term, name);
                (similarity >= floor).then(|| cap(similarity))
            }
        }
    }

    /// Scores a normalized term against every name of an entry; the best name wins.
    ///
    /// Between names with equal confidence the one closer in length wins.
    pub fn score(self, term: &str, entry: &IndexedEntry) -> Option<StrategyScore> {
        let term_len = term.chars().count();
        let mut best: Option<StrategyScore> = None;
        for name in &entry.normalized_names {
            let Some(confidence) = self.score_name(term, name) else {
                continue;
            };
            let length_diff = term_len.abs_diff(name.chars().count());
            let candidate = StrategyScore {
                confidence,
                match_type: self.match_type(),
                length_diff,
            };
            let better = match &best {
                None => true,
                Some(current) => {
                    confidence > current.confidence
                        || (confidence == current.confidence && length_diff < current.length_diff)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }
}

fn cap(confidence: f64) -> f64 {
    confidence.clamp(0.0, NON_EXACT_CAP)
}

/// Containment ratio or token-set overlap, whichever applies.
fn partial_ratio(term: &str, name: &str) -> Option<f64> {
    let (shorter, longer) = if term.chars().count() <= name.chars().count() {
        (term, name)
    } else {
        (name, term)
    };
    if contains_tokens(longer, shorter) {
        return Some(shorter.chars().count() as f64 / longer.chars().count() as f64);
    }
    let overlap = token_jaccard(term, name);
    (overlap >= TOKEN_OVERLAP_MIN).then_some(overlap)
}

/// Whether the tokens of `needle` occur as a contiguous run in `haystack`.
fn contains_tokens(haystack: &str, needle: &str) -> bool {
    let haystack: Vec<&str> = haystack.split_whitespace().collect();
    let needle: Vec<&str> = needle.split_whitespace().collect();
    !needle.is_empty()
        && haystack
            .windows(needle.len())
            .any(|window| window == needle.as_slice())
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Max of the plain Indel similarity and the token-sort similarity.
pub fn fuzzy_similarity(a: &str, b: &str) -> f64 {
    let plain = indel::normalized_similarity(a.chars(), b.chars());
    let sorted_a = sort_tokens(a);
    let sorted_b = sort_tokens(b);
    let token_sort = indel::normalized_similarity(sorted_a.chars(), sorted_b.chars());
    plain.max(token_sort)
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
