//! JSON workspace file.
//!
//! A workspace holds protocols, their steps and the metadata columns
//! persisted for each step. Every successful column write rewrites the file
//! (temp file + rename), so a crash never leaves a truncated workspace.
//!
//! ```json
//! {
//!   "protocols": [
//!     { "id": 1, "title": "Liver digest", "steps": [
//!       { "id": 1, "text": "Lyse cells in liver tissue", "columns": [] }
//!     ] }
//!   ]
//! }
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sdrf_model::{
    AnnotatorError, MetadataColumn, Protocol, ProtocolId, ProtocolStep, Result, StepId,
};

use crate::store::{
    ColumnId, MemoryState, MemoryStore, MetadataStore, ProtocolStore, StoredColumn,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub protocols: Vec<ProtocolRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolRecord {
    pub id: ProtocolId,
    pub title: String,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub text: String,
    #[serde(default)]
    pub columns: Vec<StoredColumn>,
}

impl WorkspaceDocument {
    fn into_state(self) -> Result<MemoryState> {
        let mut state = MemoryState::default();
        for protocol in self.protocols {
            if state.protocols.contains_key(&protocol.id) {
                return Err(AnnotatorError::validation(format!(
                    "duplicate protocol id {} in workspace",
                    protocol.id
                )));
            }
            let mut step_ids = Vec::with_capacity(protocol.steps.len());
            for step in protocol.steps {
                if state.steps.contains_key(&step.id) {
                    return Err(AnnotatorError::validation(format!(
                        "duplicate step id {} in workspace",
                        step.id
                    )));
                }
                for column in &step.columns {
                    state.next_column_id = state.next_column_id.max(column.id.0);
                }
                step_ids.push(step.id);
                state.steps.insert(
                    step.id,
                    ProtocolStep {
                        id: step.id,
                        protocol_id: protocol.id,
                        text: step.text,
                    },
                );
                if !step.columns.is_empty() {
                    state.columns.insert(step.id, step.columns);
                }
            }
            state.protocols.insert(
                protocol.id,
                Protocol {
                    id: protocol.id,
                    title: protocol.title,
                    steps: step_ids,
                },
            );
        }
        Ok(state)
    }

    fn from_state(state: &MemoryState) -> Self {
        let protocols = state
            .protocols
            .values()
            .map(|protocol| ProtocolRecord {
                id: protocol.id,
                title: protocol.title.clone(),
                steps: protocol
                    .steps
                    .iter()
                    .filter_map(|id| state.steps.get(id))
                    .map(|step| StepRecord {
                        id: step.id,
                        text: step.text.clone(),
                        columns: state.columns.get(&step.id).cloned().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            saved_at: Some(Utc::now().to_rfc3339()),
            protocols,
        }
    }
}

/// A [`MemoryStore`] backed by a JSON file.
#[derive(Debug)]
pub struct WorkspaceFile {
    path: PathBuf,
    store: MemoryStore,
}

impl WorkspaceFile {
    /// Opens a workspace; a missing file is an empty workspace.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|error| io_error("read", &path, &error))?;
            serde_json::from_str::<WorkspaceDocument>(&text).map_err(|error| {
                AnnotatorError::validation(format!("invalid workspace {}: {error}", path.display()))
            })?
        } else {
            WorkspaceDocument::default()
        };
        let protocols = document.protocols.len();
        let store = MemoryStore::from_state(document.into_state()?);
        debug!(path = %path.display(), protocols, "workspace opened");
        Ok(Self { path, store })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying store, e.g. to add protocols before saving.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Writes the workspace atomically.
    pub fn save(&self) -> Result<()> {
        let document = WorkspaceDocument::from_state(&self.store.state());
        let bytes = serde_json::to_vec_pretty(&document).map_err(|error| {
            AnnotatorError::persistence(format!("failed to serialize workspace: {error}"))
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|error| io_error("create directory", parent, &error))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file =
            File::create(&temp_path).map_err(|error| io_error("create", &temp_path, &error))?;
        file.write_all(&bytes)
            .map_err(|error| io_error("write", &temp_path, &error))?;
        file.sync_all()
            .map_err(|error| io_error("sync", &temp_path, &error))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|error| io_error("rename", &self.path, &error))?;

        info!(path = %self.path.display(), "workspace saved");
        Ok(())
    }
}

fn io_error(operation: &str, path: &Path, error: &std::io::Error) -> AnnotatorError {
    AnnotatorError::persistence(format!("failed to {operation} {}: {error}", path.display()))
}

impl ProtocolStore for WorkspaceFile {
    fn step(&self, id: StepId) -> Result<ProtocolStep> {
        self.store.step(id)
    }

    fn protocol(&self, id: ProtocolId) -> Result<Protocol> {
        self.store.protocol(id)
    }
}

impl MetadataStore for WorkspaceFile {
    fn create_column(&self, step: StepId, column: &MetadataColumn) -> Result<ColumnId> {
        let id = self.store.create_column(step, column)?;
        if let Err(error) = self.save() {
            // Keep memory and disk in agreement.
            self.store.delete_column(step, id)?;
            return Err(error);
        }
        Ok(id)
    }

    fn delete_column(&self, step: StepId, id: ColumnId) -> Result<()> {
        self.store.delete_column(step, id)?;
        self.save()
    }

    fn list_columns(&self, step: StepId) -> Result<Vec<MetadataColumn>> {
        self.store.list_columns(step)
    }
}
