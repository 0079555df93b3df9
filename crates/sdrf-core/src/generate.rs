//! Metadata generation: committing step columns and promoting protocol-wide ones.

use tracing::{debug, warn};

use sdrf_model::{AnnotatorError, MetadataColumn, Result, StepId};

use crate::store::{ColumnId, MetadataStore, StepLocks};

/// Result of committing a step's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// The step's column for every suggested name, as the store holds it.
    pub columns: Vec<MetadataColumn>,
    /// Columns written by this call; names already on the step are skipped.
    pub created: usize,
}

/// Writes `columns` for `step`, all or nothing.
///
/// The step lock is held for the whole sequence. A suggestion whose name is
/// already on the step is not written, and the stored column is reported in
/// its place. When any write fails the columns created by this call are
/// deleted again, newest first. If every delete succeeds the call fails with
/// a persistence error; otherwise it fails with a partial-commit error naming
/// the columns left behind.
pub fn commit_columns(
    store: &dyn MetadataStore,
    locks: &StepLocks,
    step: StepId,
    columns: &[MetadataColumn],
) -> Result<CommitOutcome> {
    locks.with_step(step, || commit_locked(store, step, columns))
}

fn commit_locked(
    store: &dyn MetadataStore,
    step: StepId,
    columns: &[MetadataColumn],
) -> Result<CommitOutcome> {
    let existing = store.list_columns(step)?;
    let mut created = Vec::new();
    let mut committed = Vec::with_capacity(columns.len());
    for column in columns {
        if let Some(stored) = existing
            .iter()
            .find(|stored| stored.name.eq_ignore_ascii_case(&column.name))
        {
            if stored.value != column.value {
                debug!(%step, column = %stored.name, "keeping stored value over suggestion");
            }
            committed.push(stored.clone());
            continue;
        }
        match store.create_column(step, column) {
            Ok(id) => created.push(id),
            Err(error) => {
                let stranded = rollback(store, step, &created);
                if stranded.is_empty() {
                    return Err(AnnotatorError::persistence(format!(
                        "writing '{}' for step {step} failed, rolled back {} column(s): {error}",
                        column.name,
                        created.len()
                    )));
                }
                return Err(AnnotatorError::PartialCommit {
                    step: step.0,
                    stranded: stranded.iter().map(|id| id.0).collect(),
                    cause: format!("writing '{}' failed: {error}", column.name),
                });
            }
        }
        committed.push(MetadataColumn {
            persisted: true,
            ..column.clone()
        });
    }

    debug!(%step, created = created.len(), skipped = columns.len() - created.len(), "columns committed");
    Ok(CommitOutcome {
        columns: committed,
        created: created.len(),
    })
}

/// Deletes `created` newest first; returns the ids that could not be deleted.
fn rollback(store: &dyn MetadataStore, step: StepId, created: &[ColumnId]) -> Vec<ColumnId> {
    warn!(%step, columns = created.len(), "rolling back partially written metadata");
    let mut stranded = Vec::new();
    for id in created.iter().rev() {
        if let Err(error) = store.delete_column(step, *id) {
            warn!(%step, column = %id, %error, "rollback delete failed");
            stranded.push(*id);
        }
    }
    stranded
}

/// Columns whose name and value are identical across every step.
///
/// Needs at least two steps; a single step has nothing to share. Order
/// follows the first step.
pub fn protocol_suggestions(steps: &[Vec<MetadataColumn>]) -> Vec<MetadataColumn> {
    let Some((first, rest)) = steps.split_first() else {
        return Vec::new();
    };
    if rest.is_empty() {
        return Vec::new();
    }
    first
        .iter()
        .filter(|column| {
            rest.iter().all(|other| {
                other
                    .iter()
                    .any(|candidate| candidate.name == column.name && candidate.value == column.value)
            })
        })
        .map(|column| MetadataColumn {
            source_match: None,
            ..column.clone()
        })
        .collect()
}

/// `steps` without the columns promoted to protocol level.
pub fn step_specific(
    steps: &[Vec<MetadataColumn>],
    promoted: &[MetadataColumn],
) -> Vec<Vec<MetadataColumn>> {
    steps
        .iter()
        .map(|columns| {
            columns
                .iter()
                .filter(|column| {
                    !promoted
                        .iter()
                        .any(|shared| shared.name == column.name && shared.value == column.value)
                })
                .cloned()
                .collect()
        })
        .collect()
}
