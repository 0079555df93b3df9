//! Annotator configuration.
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! empty file is a valid configuration. Values are checked after loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sdrf_map::{ExtractionOptions, MatchOptions};
use sdrf_model::{AnnotatorError, Result};
use sdrf_validate::CompliancePolicy;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub matching: MatchOptions,
    pub extraction: ExtractionOptions,
    pub compliance: CompliancePolicy,
    pub workers: WorkerConfig,
    pub auth: AuthConfig,
    pub ontology: OntologyConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Upper bound on threads used by protocol-level analysis.
    pub max_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Reject calls without a token.
    pub require_token: bool,
    /// Token -> user name.
    pub tokens: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Directory holding `<ontology_type>.tsv` vocabularies.
    pub directory: Option<PathBuf>,
}

impl AnnotatorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|error| AnnotatorError::configuration(format!("invalid config: {error}")))?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|error| {
            AnnotatorError::configuration(format!("failed to read {}: {error}", path.display()))
        })?;
        let config: Self = toml::from_str(&text).map_err(|error| {
            AnnotatorError::configuration(format!("failed to parse {}: {error}", path.display()))
        })?;
        config.validated()
    }

    /// Checks ranges and normalizes the required-column list.
    pub fn validated(mut self) -> Result<Self> {
        self.matching.validate()?;
        self.extraction.validate()?;
        if self.workers.max_workers == 0 {
            return Err(AnnotatorError::configuration(
                "workers.max_workers must be at least 1",
            ));
        }
        self.compliance = CompliancePolicy::new(std::mem::take(&mut self.compliance.required_columns))?;
        Ok(self)
    }
}
