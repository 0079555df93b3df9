//! Term extraction and ontology matching.
//!
//! [`TermExtractor`] turns protocol text into candidate spans and
//! [`TermMatcher`] scores them against an ontology index snapshot.

#![deny(unsafe_code)]

pub mod engine;
pub mod extract;
pub mod score;

pub use engine::{
    ConfidenceLevel, MIN_FUZZY_TERM_CHARS, MatchOptions, TermMatcher, compare_results,
    count_by_level,
};
pub use extract::{ExtractionOptions, MAX_SPAN_TOKENS, TermExtractor};
pub use score::{NON_EXACT_CAP, Strategy, StrategyScore, fuzzy_similarity};
