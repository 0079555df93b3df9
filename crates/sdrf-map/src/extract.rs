//! Candidate term extraction from protocol-step text.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sdrf_model::{AnnotatorError, ExtractedTerm, OntologyType, Result, normalize_text};

/// Largest supported span, in tokens.
pub const MAX_SPAN_TOKENS: usize = 4;

/// Characters that separate tokens in addition to whitespace.
const SEPARATORS: &[char] = &[',', ';', ':', '(', ')', '[', ']', '{', '}', '"', '/', '|'];

/// Function words and protocol filler that never form a term on their own.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "an", "and", "are", "as", "at", "be", "been", "before", "between",
    "both", "by", "during", "each", "for", "from", "has", "have", "in", "into", "is", "it", "its",
    "least", "more", "of", "on", "onto", "or", "over", "per", "than", "that", "the", "then",
    "these", "this", "those", "through", "to", "under", "until", "up", "use", "used", "using",
    "via", "was", "were", "which", "while", "with", "within", "without",
];

/// Extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    /// Longest candidate span in tokens (1..=4).
    pub max_span_tokens: usize,
    /// Tokens of context kept on each side of a span.
    pub context_window: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            max_span_tokens: MAX_SPAN_TOKENS,
            context_window: 5,
        }
    }
}

impl ExtractionOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SPAN_TOKENS).contains(&self.max_span_tokens) {
            return Err(AnnotatorError::configuration(format!(
                "max_span_tokens must be between 1 and {MAX_SPAN_TOKENS}, got {}",
                self.max_span_tokens
            )));
        }
        Ok(())
    }
}

/// Produces candidate spans from free text.
///
/// Output is ordered by token position, then by span length, and contains
/// each normalized text once (at its first position).
#[derive(Debug, Clone, Default)]
pub struct TermExtractor {
    options: ExtractionOptions,
}

impl TermExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extracts candidate terms from `text`.
    ///
    /// Numeric tokens such as `4°C` or `10min` cannot start or join a span,
    /// unless the hints ask for modifications or MS vocabulary, where names
    /// like `18O` or `10plex` are expected.
    pub fn extract(&self, text: &str, hints: &[OntologyType]) -> Vec<ExtractedTerm> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Vec::new();
        }
        let allow_numeric = hints
            .iter()
            .any(|hint| matches!(hint, OntologyType::Modification | OntologyType::MsVocabulary));
        let max_span = self.options.max_span_tokens.clamp(1, MAX_SPAN_TOKENS);

        let mut seen = BTreeSet::new();
        let mut terms = Vec::new();
        for start in 0..tokens.len() {
            for len in 1..=max_span {
                let end = start + len;
                if end > tokens.len() {
                    break;
                }
                let span = &tokens[start..end];
                if !allow_numeric && span.iter().any(|token| is_numeric_token(token)) {
                    break;
                }
                if !is_candidate_span(span) {
                    continue;
                }
                let text_span = span.join(" ");
                let normalized_text = normalize_text(&text_span);
                if normalized_text.is_empty() || !seen.insert(normalized_text.clone()) {
                    continue;
                }
                terms.push(ExtractedTerm {
                    text_span,
                    normalized_text,
                    context_window: self.context(&tokens, start, end),
                    position: start,
                });
            }
        }
        terms
    }

    fn context(&self, tokens: &[String], start: usize, end: usize) -> String {
        let from = start.saturating_sub(self.options.context_window);
        let to = (end + self.options.context_window).min(tokens.len());
        tokens[from..to].join(" ")
    }
}

/// Splits on whitespace and separators, trimming punctuation at token edges.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| ch.is_whitespace() || SEPARATORS.contains(&ch))
        .map(|raw| raw.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

fn is_stop_word(token: &str) -> bool {
    let lowered = token.to_lowercase();
    STOP_WORDS.binary_search(&lowered.as_str()).is_ok()
}

/// Pure numbers and numbers with a unit (`4°C`, `10min`, `1.5`).
fn is_numeric_token(token: &str) -> bool {
    token.chars().next().is_some_and(|ch| ch.is_ascii_digit())
}

fn is_candidate_span(span: &[String]) -> bool {
    let (Some(first), Some(last)) = (span.first(), span.last()) else {
        return false;
    };
    if span.iter().all(|token| is_stop_word(token)) {
        return false;
    }
    // "liver from" or "of mouse" are never better than the bare term.
    !(span.len() > 1 && (is_stop_word(first) || is_stop_word(last)))
}
