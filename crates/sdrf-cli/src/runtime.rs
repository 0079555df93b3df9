//! Wires configuration, ontology directory and workspace into a service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use sdrf_core::{
    AllowAnonymous, AnnotatorConfig, AnnotatorService, StaticTokens, TokenValidator, WorkspaceFile,
};
use sdrf_ontology::{DirectorySource, OntologyIndex};

/// Workspace used when `--workspace` is not given.
pub const DEFAULT_WORKSPACE: &str = "sdrf-workspace.json";

#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub config: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    /// Overrides `[ontology] directory` from the config.
    pub ontology_dir: Option<PathBuf>,
}

pub struct Runtime {
    pub service: AnnotatorService,
    pub workspace: Arc<WorkspaceFile>,
}

impl Runtime {
    pub fn open(options: &RuntimeOptions) -> Result<Self> {
        let config = load_config(options.config.as_deref())?;
        let workspace = open_workspace(options)?;

        let directory = options
            .ontology_dir
            .clone()
            .or_else(|| config.ontology.directory.clone())
            .ok_or_else(|| {
                anyhow!("no ontology directory: pass --ontology-dir or set [ontology] directory")
            })?;
        let source = Arc::new(DirectorySource::new(&directory));
        let index = OntologyIndex::load(source)
            .with_context(|| format!("load ontologies from {}", directory.display()))?;
        info!(
            directory = %directory.display(),
            entries = index.stats().total_entries,
            "ontology index loaded"
        );

        let auth = token_validator(&config);
        let service = AnnotatorService::new(
            config,
            Arc::new(index),
            workspace.clone(),
            workspace.clone(),
            auth,
        )
        .context("start annotator service")?;
        Ok(Self { service, workspace })
    }
}

/// Opens only the workspace; used by commands that never match terms.
pub fn open_workspace(options: &RuntimeOptions) -> Result<Arc<WorkspaceFile>> {
    let path = options
        .workspace
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE));
    let workspace = WorkspaceFile::open(&path)
        .with_context(|| format!("open workspace {}", path.display()))?;
    Ok(Arc::new(workspace))
}

pub fn load_config(path: Option<&Path>) -> Result<AnnotatorConfig> {
    match path {
        Some(path) => AnnotatorConfig::load(path).with_context(|| format!("load config {}", path.display())),
        None => Ok(AnnotatorConfig::default()),
    }
}

/// Static tokens when the config lists any or requires one, otherwise anyone.
pub fn token_validator(config: &AnnotatorConfig) -> Arc<dyn TokenValidator> {
    if config.auth.require_token || !config.auth.tokens.is_empty() {
        Arc::new(StaticTokens::new(
            config.auth.tokens.clone(),
            config.auth.require_token,
        ))
    } else {
        Arc::new(AllowAnonymous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_table_switches_validator() {
        let open = AnnotatorConfig::default();
        assert!(token_validator(&open).validate(Some("anyone")).is_ok());

        let locked = AnnotatorConfig::from_toml_str(
            r#"
            [auth]
            tokens = { "secret-token" = "alice" }
            "#,
        )
        .unwrap();
        let validator = token_validator(&locked);
        assert!(validator.validate(Some("anyone")).is_err());
        let capability = validator.validate(Some("secret-token")).unwrap();
        assert_eq!(capability.user(), Some("alice"));
    }

    #[test]
    fn missing_ontology_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let options = RuntimeOptions {
            workspace: Some(dir.path().join("workspace.json")),
            ..RuntimeOptions::default()
        };
        let error = Runtime::open(&options).err().unwrap();
        assert!(error.to_string().contains("no ontology directory"));
    }
}
