//! The annotator service.
//!
//! Two layers: typed operations take an explicit [`Capability`] and return
//! `Result`s; tool operations take the raw `user_token`, validate it once,
//! call the typed operation and fold everything into a [`ToolResponse`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{info, info_span};

use sdrf_map::{TermExtractor, TermMatcher};
use sdrf_model::{
    AnnotatorError, ComplianceReport, ExtractedTerm, MetadataColumn, OntologyType, ProtocolId,
    Result, StepId, base_column_name,
};
use sdrf_ontology::{IndexStats, OntologyIndex};
use sdrf_report::SdrfExport;
use sdrf_validate::validate_columns;

use crate::analysis::{Analyzer, ProtocolAnalysis, ScoredMatch, StepAnalysis};
use crate::auth::{Capability, TokenValidator};
use crate::config::AnnotatorConfig;
use crate::generate::commit_columns;
use crate::response::ToolResponse;
use crate::store::{MetadataStore, ProtocolStore, StepLocks};

/// Output of `match_ontology_terms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermMatches {
    pub matches: Vec<ScoredMatch>,
}

/// Output of `generate_sdrf_metadata`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedMetadata {
    pub step_id: StepId,
    pub auto_create: bool,
    pub created_columns: usize,
    pub column_details: Vec<MetadataColumn>,
}

pub struct AnnotatorService {
    config: AnnotatorConfig,
    index: Arc<OntologyIndex>,
    protocols: Arc<dyn ProtocolStore>,
    metadata: Arc<dyn MetadataStore>,
    auth: Arc<dyn TokenValidator>,
    analyzer: Analyzer,
    pool: ThreadPool,
    locks: StepLocks,
}

impl std::fmt::Debug for AnnotatorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotatorService")
            .field("index", &self.index)
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl AnnotatorService {
    pub fn new(
        config: AnnotatorConfig,
        index: Arc<OntologyIndex>,
        protocols: Arc<dyn ProtocolStore>,
        metadata: Arc<dyn MetadataStore>,
        auth: Arc<dyn TokenValidator>,
    ) -> Result<Self> {
        let config = config.validated()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max_workers)
            .thread_name(|index| format!("sdrf-analysis-{index}"))
            .build()
            .map_err(|error| {
                AnnotatorError::configuration(format!("failed to start worker pool: {error}"))
            })?;
        let analyzer = Analyzer::new(
            TermExtractor::new(config.extraction),
            TermMatcher::new(config.matching),
        );
        Ok(Self {
            config,
            index,
            protocols,
            metadata,
            auth,
            analyzer,
            pool,
            locks: StepLocks::default(),
        })
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn index(&self) -> &OntologyIndex {
        &self.index
    }

    /// Resolves a user token into a capability.
    pub fn authorize(&self, user_token: Option<&str>) -> Result<Capability> {
        self.auth.validate(user_token)
    }

    // Typed operations.

    pub fn analyze_step(&self, capability: &Capability, step_id: StepId) -> Result<StepAnalysis> {
        let span = info_span!("analyze_step", step_id = %step_id, user = user_label(capability));
        let _guard = span.enter();
        let start = Instant::now();

        let step = self.protocols.step(step_id)?;
        let snapshot = self.index.snapshot();
        let analysis = self.analyzer.analyze_step(&snapshot, &step)?;
        info!(
            terms = analysis.analysis_summary.term_count,
            matches = analysis.analysis_summary.match_count,
            generation = snapshot.generation(),
            duration_ms = start.elapsed().as_millis(),
            "step analysis complete"
        );
        Ok(analysis)
    }

    /// Matches standalone terms; `ontology_types` empty means all types.
    pub fn match_terms(
        &self,
        terms: &[String],
        ontology_types: &[String],
        min_confidence: Option<f64>,
    ) -> Result<TermMatches> {
        if terms.is_empty() {
            return Err(AnnotatorError::validation("terms must not be empty"));
        }
        if let Some(blank) = terms.iter().position(|term| term.trim().is_empty()) {
            return Err(AnnotatorError::validation(format!("term {blank} is empty")));
        }
        let types = OntologyType::parse_list(ontology_types)?;
        let min_confidence = min_confidence.unwrap_or(self.config.matching.min_confidence);

        let extracted: Vec<ExtractedTerm> = terms
            .iter()
            .enumerate()
            .map(|(position, term)| ExtractedTerm::standalone(term, position))
            .collect();
        let snapshot = self.index.snapshot();
        let matcher = self.analyzer.matcher();
        let results = matcher.match_terms(&snapshot, &extracted, &types, min_confidence)?;
        let matches = results
            .into_iter()
            .map(|result| ScoredMatch {
                confidence_level: matcher.options().level(result.confidence),
                result,
            })
            .collect();
        Ok(TermMatches { matches })
    }

    /// Suggests columns for a step and, with `auto_create`, persists them.
    ///
    /// A dry run has no side effects. Persisting needs an authenticated
    /// caller and is all-or-nothing for the step.
    pub fn generate(
        &self,
        capability: &Capability,
        step_id: StepId,
        auto_create: bool,
    ) -> Result<GeneratedMetadata> {
        let span = info_span!("generate", step_id = %step_id, auto_create, user = user_label(capability));
        let _guard = span.enter();
        let start = Instant::now();

        if auto_create {
            capability.require_authenticated("auto_create")?;
        }
        let step = self.protocols.step(step_id)?;
        let snapshot = self.index.snapshot();
        let suggestions = self.analyzer.analyze_step(&snapshot, &step)?.sdrf_suggestions;

        let (created_columns, column_details) = if auto_create {
            let outcome = commit_columns(self.metadata.as_ref(), &self.locks, step_id, &suggestions)?;
            (outcome.created, outcome.columns)
        } else {
            (0, suggestions)
        };
        info!(
            created_columns,
            suggested = column_details.len(),
            duration_ms = start.elapsed().as_millis(),
            "metadata generation complete"
        );
        Ok(GeneratedMetadata {
            step_id,
            auto_create,
            created_columns,
            column_details,
        })
    }

    /// Checks a step's persisted columns against the required-column policy.
    pub fn validate_step(&self, capability: &Capability, step_id: StepId) -> Result<ComplianceReport> {
        let span = info_span!("validate", step_id = %step_id, user = user_label(capability));
        let _guard = span.enter();

        let step = self.protocols.step(step_id)?;
        let columns = self.metadata.list_columns(step_id)?;
        let snapshot = self.index.snapshot();
        let suggestions = self.analyzer.analyze_step(&snapshot, &step)?.sdrf_suggestions;
        let report = validate_columns(&columns, &self.config.compliance, &candidate_values(&suggestions));
        info!(
            compliant = report.compliant,
            issues = report.issue_count(),
            "compliance check complete"
        );
        Ok(report)
    }

    /// Exports a protocol's persisted columns, one row per step.
    pub fn export(&self, capability: &Capability, protocol_id: ProtocolId) -> Result<SdrfExport> {
        let span = info_span!("export", protocol_id = %protocol_id, user = user_label(capability));
        let _guard = span.enter();
        let start = Instant::now();

        let protocol = self.protocols.protocol(protocol_id)?;
        let steps = protocol
            .steps
            .iter()
            .map(|step| self.metadata.list_columns(*step))
            .collect::<Result<Vec<_>>>()?;
        let export = sdrf_report::export(&steps)?;
        info!(
            headers = export.headers.len(),
            rows = export.rows.len(),
            duration_ms = start.elapsed().as_millis(),
            "export complete"
        );
        Ok(export)
    }

    pub fn analyze_protocol(
        &self,
        capability: &Capability,
        protocol_id: ProtocolId,
    ) -> Result<ProtocolAnalysis> {
        let span = info_span!("analyze_protocol", protocol_id = %protocol_id, user = user_label(capability));
        let _guard = span.enter();
        let start = Instant::now();

        let protocol = self.protocols.protocol(protocol_id)?;
        let steps = protocol
            .steps
            .iter()
            .map(|step| self.protocols.step(*step))
            .collect::<Result<Vec<_>>>()?;
        let snapshot = self.index.snapshot();
        let analysis = self
            .analyzer
            .analyze_protocol(&self.pool, &snapshot, protocol_id, &steps)?;
        info!(
            steps = analysis.step_results.len(),
            protocol_columns = analysis.protocol_sdrf_suggestions.len(),
            duration_ms = start.elapsed().as_millis(),
            "protocol analysis complete"
        );
        Ok(analysis)
    }

    /// Rebuilds the ontology index from its source.
    pub fn refresh_ontologies(&self) -> Result<IndexStats> {
        self.index.refresh()
    }

    pub fn ontology_stats(&self) -> IndexStats {
        self.index.stats()
    }

    // Tool operations.

    pub fn analyze_protocol_step(&self, step_id: u64, user_token: Option<&str>) -> ToolResponse {
        self.authorize(user_token)
            .and_then(|capability| self.analyze_step(&capability, StepId(step_id)))
            .into()
    }

    pub fn match_ontology_terms(
        &self,
        terms: &[String],
        ontology_types: Option<&[String]>,
        min_confidence: Option<f64>,
    ) -> ToolResponse {
        self.match_terms(terms, ontology_types.unwrap_or_default(), min_confidence)
            .into()
    }

    pub fn generate_sdrf_metadata(
        &self,
        step_id: u64,
        auto_create: Option<bool>,
        user_token: Option<&str>,
    ) -> ToolResponse {
        let result = self
            .authorize(user_token)
            .and_then(|capability| self.generate(&capability, StepId(step_id), auto_create.unwrap_or(false)));
        match result {
            Ok(generated) => ToolResponse::success(&generated),
            Err(error) => ToolResponse::generation_failure(&error),
        }
    }

    pub fn validate_sdrf_compliance(&self, step_id: u64, user_token: Option<&str>) -> ToolResponse {
        self.authorize(user_token)
            .and_then(|capability| self.validate_step(&capability, StepId(step_id)))
            .into()
    }

    pub fn export_sdrf_file(&self, protocol_id: u64, user_token: Option<&str>) -> ToolResponse {
        self.authorize(user_token)
            .and_then(|capability| self.export(&capability, ProtocolId(protocol_id)))
            .into()
    }

    pub fn analyze_full_protocol(&self, protocol_id: u64, user_token: Option<&str>) -> ToolResponse {
        self.authorize(user_token)
            .and_then(|capability| self.analyze_protocol(&capability, ProtocolId(protocol_id)))
            .into()
    }
}

fn user_label(capability: &Capability) -> &str {
    capability.user().unwrap_or("anonymous")
}

/// Best suggested value per lowercase base column name.
fn candidate_values(suggestions: &[MetadataColumn]) -> BTreeMap<String, String> {
    let mut candidates = BTreeMap::new();
    for column in suggestions {
        candidates
            .entry(base_column_name(&column.name).to_lowercase())
            .or_insert_with(|| column.value.clone());
    }
    candidates
}
