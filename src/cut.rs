//! Cut normalization.
//!
//! Converts cut operations into deletes. Touching or overlapping cuts are
//! merged into one region first. When a region is finalized, every pending
//! operation that is not entirely outside it is resolved:
//!
//! - deletes keep only their part after the region, or vanish into it
//! - inserts and replaces are dropped, since truncating their text has no
//!   well defined meaning
//!
//! Masking a replacement partially needs an explicit additional cut.

use crate::operation::{EditOperation, OperationKind};
use std::collections::BTreeMap;
use std::ops::Range;

/// Result of cut normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Remaining operations, sorted by `(begin, end)`, without any cut
    pub operations: Vec<EditOperation>,
    /// Operations removed by a cut or made redundant by a delete
    pub discarded: Vec<EditOperation>,
}

/// Single left-to-right pass over a sorted batch.
#[derive(Debug)]
pub struct CutNormalizer {
    text_len: usize,
    /// Pending non-cut operations; `None` once removed
    pending: Vec<Option<EditOperation>>,
    /// Index into `pending` keyed by end offset
    endings: BTreeMap<usize, Vec<usize>>,
    /// Deletes produced from finalized regions and delete remainders
    emitted: Vec<EditOperation>,
    discarded: Vec<EditOperation>,
    region: Option<Range<usize>>,
}

impl CutNormalizer {
    pub fn new(text_len: usize) -> Self {
        Self {
            text_len,
            pending: Vec::new(),
            endings: BTreeMap::new(),
            emitted: Vec::new(),
            discarded: Vec::new(),
            region: None,
        }
    }

    /// Normalize `operations`, which must be sorted by `(begin, end)`.
    pub fn normalize(mut self, operations: impl IntoIterator<Item = EditOperation>) -> Normalized {
        for operation in operations {
            if operation.is_cut() {
                self.visit_cut(&operation);
            } else {
                self.record(operation);
            }
        }

        if let Some(region) = self.region.take() {
            self.finalize(region);
        }

        let mut operations: Vec<EditOperation> = self
            .pending
            .into_iter()
            .flatten()
            .chain(self.emitted)
            .collect();
        operations.sort_by_key(EditOperation::sort_key);

        let (operations, redundant) = remove_covered_deletes(operations);
        let mut discarded = self.discarded;
        discarded.extend(redundant);

        Normalized {
            operations,
            discarded,
        }
    }

    fn record(&mut self, operation: EditOperation) {
        let index = self.pending.len();
        self.endings.entry(operation.end).or_default().push(index);
        self.pending.push(Some(operation));
    }

    fn visit_cut(&mut self, cut: &EditOperation) {
        let begin = cut.begin.min(self.text_len);
        let end = cut.end.min(self.text_len);

        match self.region.take() {
            Some(region) if begin <= region.end => {
                self.region = Some(region.start..region.end.max(end));
            }
            Some(region) => {
                self.finalize(region);
                self.region = Some(begin..end);
            }
            None => self.region = Some(begin..end),
        }
    }

    /// Turn a merged cut region into a delete and resolve the operations it touches.
    fn finalize(&mut self, region: Range<usize>) {
        let Range { start: begin, end } = region;
        if end <= begin {
            return;
        }
        tracing::debug!(begin, end, "finalizing cut region");
        self.emitted.push(EditOperation::delete(begin, end));

        // Anything ending before the region can never meet a later region either.
        self.endings = self.endings.split_off(&begin);

        let affected: Vec<usize> = self
            .endings
            .values()
            .flatten()
            .copied()
            .filter(|&index| {
                self.pending[index]
                    .as_ref()
                    .is_some_and(|op| op.intersects(begin, end))
            })
            .collect();

        for index in affected {
            let Some(operation) = self.pending[index].take() else {
                continue;
            };
            self.unindex(operation.end, index);

            if operation.kind == OperationKind::Delete {
                if operation.end > end {
                    tracing::debug!(%operation, end, "truncating delete to start after cut");
                    let remainder = EditOperation::delete(end, operation.end);
                    self.endings.entry(remainder.end).or_default().push(index);
                    self.pending[index] = Some(remainder);
                } else {
                    tracing::debug!(%operation, begin, end, "delete subsumed by cut");
                    self.discarded.push(operation);
                }
            } else {
                tracing::debug!(%operation, begin, end, "dropping operation overlapping cut");
                self.discarded.push(operation);
            }
        }
    }

    fn unindex(&mut self, end: usize, index: usize) {
        if let Some(indices) = self.endings.get_mut(&end) {
            indices.retain(|&i| i != index);
            if indices.is_empty() {
                self.endings.remove(&end);
            }
        }
    }
}

/// Normalize a sorted batch against a text of `text_len` bytes.
pub fn normalize_cuts(
    operations: impl IntoIterator<Item = EditOperation>,
    text_len: usize,
) -> Normalized {
    CutNormalizer::new(text_len).normalize(operations)
}

/// Drop deletes contained in another delete, keeping one of several duplicates.
///
/// Other operation kinds pass through untouched. Input must be sorted by
/// `(begin, end)`; output keeps that order.
pub fn remove_covered_deletes(
    operations: Vec<EditOperation>,
) -> (Vec<EditOperation>, Vec<EditOperation>) {
    let mut order: Vec<usize> = (0..operations.len())
        .filter(|&i| operations[i].is_delete())
        .collect();
    // Longest first among equal begins, so containers precede what they contain.
    order.sort_by(|&a, &b| {
        let (a, b) = (&operations[a], &operations[b]);
        a.begin.cmp(&b.begin).then(b.end.cmp(&a.end))
    });

    let mut covered = vec![false; operations.len()];
    let mut reach: Option<usize> = None;
    for index in order {
        let end = operations[index].end;
        match reach {
            Some(max_end) if end <= max_end => covered[index] = true,
            _ => reach = Some(end),
        }
    }

    let mut kept = Vec::with_capacity(operations.len());
    let mut removed = Vec::new();
    for (operation, covered) in operations.into_iter().zip(covered) {
        if covered {
            tracing::debug!(%operation, "removing delete covered by another delete");
            removed.push(operation);
        } else {
            kept.push(operation);
        }
    }
    (kept, removed)
}
