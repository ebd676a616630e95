//! Per-document pipeline: validate, normalize cuts, select, apply.
//!
//! The batch must be sorted by `(begin, end)` ascending. The pipeline checks
//! this but never re-sorts; ordering is the caller's responsibility.

use crate::aligned::{AlignedString, AlignmentError};
use crate::cut::normalize_cuts;
use crate::operation::{EditOperation, OperationKind, RejectedOperation};
use crate::registry::{AlignmentKey, AlignmentRegistry, RegistryError};
use crate::select::{select, Selection};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Changes are not sorted by (begin, end): change #{index} precedes its predecessor")]
    Unsorted { index: usize },

    #[error("Cut {0} reached the application stage unresolved")]
    UnresolvedCut(EditOperation),

    #[error("Failed to apply {operation}: {source}")]
    Apply {
        operation: EditOperation,
        #[source]
        source: AlignmentError,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// What happened to each submitted change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    /// Executed operations, in execution order (right to left)
    pub applied: Vec<EditOperation>,
    /// Operations removed by a cut, by a covering delete, or by selection
    pub discarded: Vec<EditOperation>,
    /// Operations that failed validation
    pub rejected: Vec<RejectedOperation>,
}

/// Outcome of running a batch against one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "Transformation holds the transformed text and its alignment"]
pub struct Transformation {
    pub aligned: AlignedString,
    pub report: ChangeReport,
}

impl Transformation {
    /// The transformed text.
    pub fn text(&self) -> String {
        self.aligned.get()
    }

    /// Freeze the alignment into `registry` under `key`.
    pub fn register(
        self,
        registry: &AlignmentRegistry,
        key: AlignmentKey,
    ) -> Result<(Arc<AlignedString>, ChangeReport), RegistryError> {
        let aligned = registry.register(key, self.aligned)?;
        Ok((aligned, self.report))
    }
}

/// Apply a sorted batch of changes to `text`.
///
/// Malformed changes are rejected individually and reported; the rest of the
/// batch still runs. An empty batch yields the identity alignment.
pub fn apply_changes(
    text: &str,
    operations: &[EditOperation],
) -> Result<Transformation, PipelineError> {
    check_sorted(operations)?;
    tracing::info!(changes = operations.len(), "found changes");

    let mut report = ChangeReport::default();
    let mut valid = Vec::with_capacity(operations.len());
    for (index, operation) in operations.iter().enumerate() {
        match operation.validate(text) {
            Ok(()) => valid.push(operation.clone()),
            Err(error) => {
                tracing::warn!(index, %operation, %error, "rejecting change");
                report.rejected.push(RejectedOperation {
                    index,
                    operation: operation.clone(),
                    error,
                });
            }
        }
    }

    let normalized = normalize_cuts(valid, text.len());
    report.discarded = normalized.discarded;

    let Selection { kept, discarded } = select(normalized.operations);
    report.discarded.extend(discarded);

    let mut aligned = AlignedString::new(text);
    for operation in kept.iter().rev() {
        apply_operation(&mut aligned, operation)?;
    }
    report.applied = kept.into_iter().rev().collect();

    tracing::debug!(
        applied = report.applied.len(),
        discarded = report.discarded.len(),
        rejected = report.rejected.len(),
        "changes applied"
    );

    Ok(Transformation { aligned, report })
}

/// Run [`apply_changes`] and register the resulting alignment.
pub fn apply_and_register(
    registry: &AlignmentRegistry,
    key: AlignmentKey,
    text: &str,
    operations: &[EditOperation],
) -> Result<(Arc<AlignedString>, ChangeReport), PipelineError> {
    let transformation = apply_changes(text, operations)?;
    Ok(transformation.register(registry, key)?)
}

/// Dispatch one selected operation to the matching [`AlignedString`] edit.
fn apply_operation(
    aligned: &mut AlignedString,
    operation: &EditOperation,
) -> Result<(), PipelineError> {
    let value = operation.value.as_deref().unwrap_or_default();
    let result = match operation.kind {
        OperationKind::Insert => aligned.insert(operation.begin, value),
        OperationKind::Delete => aligned.delete(operation.begin, operation.end),
        OperationKind::Replace => aligned.replace(operation.begin, operation.end, value),
        OperationKind::Cut => return Err(PipelineError::UnresolvedCut(operation.clone())),
    };
    result.map_err(|source| PipelineError::Apply {
        operation: operation.clone(),
        source,
    })
}

fn check_sorted(operations: &[EditOperation]) -> Result<(), PipelineError> {
    match operations
        .windows(2)
        .position(|pair| pair[0].sort_key() > pair[1].sort_key())
    {
        Some(position) => Err(PipelineError::Unsorted {
            index: position + 1,
        }),
        None => Ok(()),
    }
}
