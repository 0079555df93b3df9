//! Protocol and metadata collaborators.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use sdrf_model::{
    AnnotatorError, MetadataColumn, Protocol, ProtocolId, ProtocolStep, Result, StepId,
};

/// Identifier of a persisted metadata column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ColumnId(pub u64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read access to protocols and their steps.
pub trait ProtocolStore: Send + Sync {
    fn step(&self, id: StepId) -> Result<ProtocolStep>;
    fn protocol(&self, id: ProtocolId) -> Result<Protocol>;
}

/// Persisted metadata columns per step.
pub trait MetadataStore: Send + Sync {
    fn create_column(&self, step: StepId, column: &MetadataColumn) -> Result<ColumnId>;
    fn delete_column(&self, step: StepId, id: ColumnId) -> Result<()>;
    /// Columns of a step in creation order, marked as persisted.
    fn list_columns(&self, step: StepId) -> Result<Vec<MetadataColumn>>;
}

/// A column as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredColumn {
    pub id: ColumnId,
    pub name: String,
    pub value: String,
}

impl StoredColumn {
    fn to_column(&self) -> MetadataColumn {
        MetadataColumn {
            persisted: true,
            ..MetadataColumn::new(self.name.clone(), self.value.clone())
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct MemoryState {
    pub(crate) protocols: BTreeMap<ProtocolId, Protocol>,
    pub(crate) steps: BTreeMap<StepId, ProtocolStep>,
    pub(crate) columns: BTreeMap<StepId, Vec<StoredColumn>>,
    pub(crate) next_column_id: u64,
}

/// In-memory protocol and metadata store.
///
/// Column writes can be made to fail after a number of successes, and
/// deletes can be made to fail outright, which is how rollback behavior is
/// exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    // Remaining successful creates before failures start.
    create_budget: Mutex<Option<usize>>,
    reject_deletes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: MemoryState) -> Self {
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    pub(crate) fn state(&self) -> MemoryState {
        self.state.read().clone()
    }

    /// Adds a protocol whose steps get consecutive ids after the current maximum.
    pub fn add_protocol<I, S>(&self, title: impl Into<String>, steps: I) -> ProtocolId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.write();
        let protocol_id = ProtocolId(state.protocols.keys().last().map_or(1, |id| id.0 + 1));
        let mut next_step = state.steps.keys().last().map_or(1, |id| id.0 + 1);

        let mut step_ids = Vec::new();
        for text in steps {
            let id = StepId(next_step);
            next_step += 1;
            state.steps.insert(
                id,
                ProtocolStep {
                    id,
                    protocol_id,
                    text: text.into(),
                },
            );
            step_ids.push(id);
        }
        state.protocols.insert(
            protocol_id,
            Protocol {
                id: protocol_id,
                title: title.into(),
                steps: step_ids,
            },
        );
        protocol_id
    }

    /// Lets the next `successes` creates succeed; later ones fail.
    pub fn fail_creates_after(&self, successes: usize) {
        *self.create_budget.lock() = Some(successes);
    }

    /// Makes every delete fail until failures are cleared.
    pub fn fail_deletes(&self) {
        *self.reject_deletes.lock() = true;
    }

    pub fn clear_failures(&self) {
        *self.create_budget.lock() = None;
        *self.reject_deletes.lock() = false;
    }

    pub fn column_count(&self, step: StepId) -> usize {
        self.state.read().columns.get(&step).map_or(0, Vec::len)
    }

    fn take_create_budget(&self) -> Result<()> {
        let mut budget = self.create_budget.lock();
        match budget.as_mut() {
            Some(0) => Err(AnnotatorError::persistence("metadata store rejected the write")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl ProtocolStore for MemoryStore {
    fn step(&self, id: StepId) -> Result<ProtocolStep> {
        self.state
            .read()
            .steps
            .get(&id)
            .cloned()
            .ok_or(AnnotatorError::NotFound {
                kind: "step",
                id: id.0,
            })
    }

    fn protocol(&self, id: ProtocolId) -> Result<Protocol> {
        self.state
            .read()
            .protocols
            .get(&id)
            .cloned()
            .ok_or(AnnotatorError::NotFound {
                kind: "protocol",
                id: id.0,
            })
    }
}

impl MetadataStore for MemoryStore {
    fn create_column(&self, step: StepId, column: &MetadataColumn) -> Result<ColumnId> {
        self.take_create_budget()?;
        let mut state = self.state.write();
        if !state.steps.contains_key(&step) {
            return Err(AnnotatorError::NotFound {
                kind: "step",
                id: step.0,
            });
        }
        state.next_column_id += 1;
        let id = ColumnId(state.next_column_id);
        state.columns.entry(step).or_default().push(StoredColumn {
            id,
            name: column.name.clone(),
            value: column.value.clone(),
        });
        Ok(id)
    }

    fn delete_column(&self, step: StepId, id: ColumnId) -> Result<()> {
        if *self.reject_deletes.lock() {
            return Err(AnnotatorError::persistence("metadata store rejected the delete"));
        }
        let mut state = self.state.write();
        let columns = state.columns.entry(step).or_default();
        let before = columns.len();
        columns.retain(|stored| stored.id != id);
        if columns.len() == before {
            return Err(AnnotatorError::persistence(format!(
                "column {id} does not exist on step {step}"
            )));
        }
        Ok(())
    }

    fn list_columns(&self, step: StepId) -> Result<Vec<MetadataColumn>> {
        let state = self.state.read();
        if !state.steps.contains_key(&step) {
            return Err(AnnotatorError::NotFound {
                kind: "step",
                id: step.0,
            });
        }
        Ok(state
            .columns
            .get(&step)
            .map(|columns| columns.iter().map(StoredColumn::to_column).collect())
            .unwrap_or_default())
    }
}

/// One mutex per step, created on first use and dropped once no caller
/// holds or waits on it.
///
/// Held for the whole create-or-rollback sequence of a generate call so two
/// writers never interleave on the same step.
#[derive(Debug, Default)]
pub struct StepLocks {
    locks: Mutex<HashMap<StepId, Arc<Mutex<()>>>>,
}

impl StepLocks {
    /// Runs `operation` while holding the lock of `step`.
    pub fn with_step<T>(&self, step: StepId, operation: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.locks.lock().entry(step).or_default());
        let result = {
            let _guard = lock.lock();
            operation()
        };
        self.release(step, lock);
        result
    }

    /// Steps with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, step: StepId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        // Only the map's own reference left: nobody holds or waits on it.
        if locks
            .get(&step)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&step);
        }
    }
}
