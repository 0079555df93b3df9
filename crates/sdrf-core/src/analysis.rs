//! Step and protocol analysis.
//!
//! A step analysis runs extraction, matching and classification over one
//! step's text against a single index snapshot. Protocol analysis fans the
//! steps out over a bounded rayon pool and puts the results back in step
//! order before aggregating.

use std::collections::BTreeMap;

use rayon::ThreadPool;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use sdrf_map::{ConfidenceLevel, MatchOptions, TermExtractor, TermMatcher};
use sdrf_model::{
    ExtractedTerm, MatchResult, MetadataColumn, OntologyType, ProtocolId, ProtocolStep, Result,
    StepId,
};
use sdrf_ontology::IndexSnapshot;

use crate::classify::classify;
use crate::generate::{protocol_suggestions, step_specific};

/// A match with its confidence level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub result: MatchResult,
    pub confidence_level: ConfidenceLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub term_count: usize,
    pub match_count: usize,
    pub matches_by_type: BTreeMap<OntologyType, usize>,
    pub high_confidence: usize,
    pub low_confidence: usize,
    pub suggested_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepAnalysis {
    pub step_id: StepId,
    pub extracted_terms: Vec<ExtractedTerm>,
    pub ontology_matches: Vec<ScoredMatch>,
    pub sdrf_suggestions: Vec<MetadataColumn>,
    pub analysis_summary: AnalysisSummary,
}

/// Suggestions left on one step after protocol-level promotion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSuggestions {
    pub step_id: StepId,
    pub columns: Vec<MetadataColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolAnalysis {
    pub protocol_id: ProtocolId,
    pub step_results: Vec<StepAnalysis>,
    /// Columns shared verbatim by every step.
    pub protocol_sdrf_suggestions: Vec<MetadataColumn>,
    /// Per step in protocol order, the suggestions not promoted.
    pub step_sdrf_suggestions: Vec<StepSuggestions>,
}

impl ProtocolAnalysis {
    pub fn step_suggestions(&self, step_id: StepId) -> Option<&[MetadataColumn]> {
        self.step_sdrf_suggestions
            .iter()
            .find(|step| step.step_id == step_id)
            .map(|step| step.columns.as_slice())
    }
}

/// Extraction, matching and classification with fixed settings.
#[derive(Debug, Clone)]
pub struct Analyzer {
    extractor: TermExtractor,
    matcher: TermMatcher,
}

impl Analyzer {
    pub fn new(extractor: TermExtractor, matcher: TermMatcher) -> Self {
        Self { extractor, matcher }
    }

    pub fn matcher(&self) -> &TermMatcher {
        &self.matcher
    }

    /// Analyzes one step's text.
    ///
    /// Vocabularies with digit-leading names (`18O`) are passed to the
    /// extractor as hints so such tokens can form terms.
    pub fn analyze_step(&self, snapshot: &IndexSnapshot, step: &ProtocolStep) -> Result<StepAnalysis> {
        let hints = snapshot.types_with_numeric_names();
        let extracted_terms = self.extractor.extract(&step.text, &hints);
        let matches = self.matcher.match_terms(
            snapshot,
            &extracted_terms,
            &[],
            self.matcher.options().min_confidence,
        )?;
        let sdrf_suggestions = classify(&matches);
        let analysis_summary = summarize(
            &extracted_terms,
            &matches,
            &sdrf_suggestions,
            self.matcher.options(),
        );
        debug!(
            step_id = %step.id,
            terms = analysis_summary.term_count,
            matches = analysis_summary.match_count,
            columns = analysis_summary.suggested_columns,
            "step analyzed"
        );
        Ok(StepAnalysis {
            step_id: step.id,
            extracted_terms,
            ontology_matches: score_levels(matches, self.matcher.options()),
            sdrf_suggestions,
            analysis_summary,
        })
    }

    /// Analyzes every step of a protocol on `pool`.
    ///
    /// Completion order is irrelevant; results are re-sorted by step position.
    pub fn analyze_protocol(
        &self,
        pool: &ThreadPool,
        snapshot: &IndexSnapshot,
        protocol_id: ProtocolId,
        steps: &[ProtocolStep],
    ) -> Result<ProtocolAnalysis> {
        let mut indexed: Vec<(usize, StepAnalysis)> = pool.install(|| {
            steps
                .par_iter()
                .enumerate()
                .map(|(index, step)| self.analyze_step(snapshot, step).map(|analysis| (index, analysis)))
                .collect::<Result<Vec<_>>>()
        })?;
        indexed.sort_by_key(|(index, _)| *index);
        let step_results: Vec<StepAnalysis> = indexed.into_iter().map(|(_, analysis)| analysis).collect();

        let per_step: Vec<Vec<MetadataColumn>> = step_results
            .iter()
            .map(|analysis| analysis.sdrf_suggestions.clone())
            .collect();
        let protocol_sdrf_suggestions = protocol_suggestions(&per_step);
        let step_sdrf_suggestions = step_results
            .iter()
            .map(|analysis| analysis.step_id)
            .zip(step_specific(&per_step, &protocol_sdrf_suggestions))
            .map(|(step_id, columns)| StepSuggestions { step_id, columns })
            .collect();

        Ok(ProtocolAnalysis {
            protocol_id,
            step_results,
            protocol_sdrf_suggestions,
            step_sdrf_suggestions,
        })
    }
}

fn score_levels(matches: Vec<MatchResult>, options: &MatchOptions) -> Vec<ScoredMatch> {
    matches
        .into_iter()
        .map(|result| ScoredMatch {
            confidence_level: options.level(result.confidence),
            result,
        })
        .collect()
}

fn summarize(
    terms: &[ExtractedTerm],
    matches: &[MatchResult],
    columns: &[MetadataColumn],
    options: &MatchOptions,
) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        term_count: terms.len(),
        match_count: matches.len(),
        suggested_columns: columns.len(),
        ..AnalysisSummary::default()
    };
    for result in matches {
        *summary
            .matches_by_type
            .entry(result.entry.ontology_type)
            .or_insert(0) += 1;
        match options.level(result.confidence) {
            ConfidenceLevel::High => summary.high_confidence += 1,
            ConfidenceLevel::Low => summary.low_confidence += 1,
        }
    }
    summary
}
