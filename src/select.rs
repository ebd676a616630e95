//! Overlap resolution: the earliest, longest operation wins.

use crate::operation::EditOperation;

/// Operations chosen for execution and those covered by them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Kept operations, ascending by `(begin, end)`, mutually non-overlapping
    pub kept: Vec<EditOperation>,
    /// Operations covered by a kept operation
    pub discarded: Vec<EditOperation>,
}

impl Selection {
    /// Kept operations in the order they must be applied.
    ///
    /// Rightmost first: applying an operation only shifts offsets to its
    /// right, which have all been processed already.
    pub fn execution_order(&self) -> impl Iterator<Item = &EditOperation> {
        self.kept.iter().rev()
    }

    pub fn into_execution_order(self) -> Vec<EditOperation> {
        let mut kept = self.kept;
        kept.reverse();
        kept
    }
}

/// Select operations from a batch sorted by `(begin, end)`.
///
/// Each operation is compared to the last one kept (the current top). It is
/// discarded when it starts inside the top or has exactly the same span,
/// otherwise it becomes the new top. The operation starting first wins.
/// Among non-empty operations starting at the same offset the longest wins:
/// a longer candidate displaces the top it would otherwise be covered by.
pub fn select(operations: impl IntoIterator<Item = EditOperation>) -> Selection {
    let mut selection = Selection::default();

    for candidate in operations {
        let Some(top) = selection.kept.last() else {
            selection.kept.push(candidate);
            continue;
        };

        if extends(top, &candidate) {
            tracing::debug!(operation = %candidate, replaced = %top, "longer operation wins");
            if let Some(shorter) = selection.kept.pop() {
                selection.discarded.push(shorter);
            }
            selection.kept.push(candidate);
        } else if covers(top, &candidate) {
            tracing::debug!(operation = %candidate, "skipping operation covered by another");
            selection.discarded.push(candidate);
        } else {
            selection.kept.push(candidate);
        }
    }

    selection
}

fn covers(top: &EditOperation, candidate: &EditOperation) -> bool {
    (top.begin <= candidate.begin && top.end > candidate.begin)
        || (top.begin == candidate.begin && top.end == candidate.end)
}

/// Same start, reaching further. Zero-width tops are left alone so an insert
/// in front of a span survives.
fn extends(top: &EditOperation, candidate: &EditOperation) -> bool {
    top.begin == candidate.begin && top.end > top.begin && candidate.end > top.end
}
