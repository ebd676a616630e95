use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// The kind of change an [`EditOperation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert `value` at `begin`.
    Insert,
    /// Replace `[begin, end)` with `value`.
    Replace,
    /// Remove `[begin, end)`.
    Delete,
    /// Remove `[begin, end)` and invalidate every other operation overlapping it.
    Cut,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Replace => "replace",
            OperationKind::Delete => "delete",
            OperationKind::Cut => "cut",
        }
    }

    /// Whether operations of this kind carry replacement text.
    pub fn requires_value(self) -> bool {
        matches!(self, OperationKind::Insert | OperationKind::Replace)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declarative change against the source text.
///
/// Offsets are byte offsets into the text the batch was recorded against.
/// They are never rebased by the caller; the pipeline applies operations
/// right to left so that unprocessed offsets stay valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditOperation {
    /// Starting byte offset (inclusive)
    pub begin: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    #[serde(rename = "operation")]
    pub kind: OperationKind,
    /// Text for insert and replace, ignored otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Invalid {kind} range: [{begin}, {end}) in text of length {text_len}")]
    InvalidRange {
        kind: OperationKind,
        begin: usize,
        end: usize,
        text_len: usize,
    },

    #[error("{kind} offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { kind: OperationKind, offset: usize },

    #[error("{kind} at [{begin}, {end}) has no value")]
    MissingValue {
        kind: OperationKind,
        begin: usize,
        end: usize,
    },
}

impl EditOperation {
    pub fn new(begin: usize, end: usize, kind: OperationKind, value: Option<String>) -> Self {
        Self {
            begin,
            end,
            kind,
            value,
        }
    }

    pub fn insert(at: usize, value: impl Into<String>) -> Self {
        Self::new(at, at, OperationKind::Insert, Some(value.into()))
    }

    pub fn replace(begin: usize, end: usize, value: impl Into<String>) -> Self {
        Self::new(begin, end, OperationKind::Replace, Some(value.into()))
    }

    pub fn delete(begin: usize, end: usize) -> Self {
        Self::new(begin, end, OperationKind::Delete, None)
    }

    pub fn cut(begin: usize, end: usize) -> Self {
        Self::new(begin, end, OperationKind::Cut, None)
    }

    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    pub fn is_cut(&self) -> bool {
        self.kind == OperationKind::Cut
    }

    pub fn is_delete(&self) -> bool {
        self.kind == OperationKind::Delete
    }

    /// Ordering key the pipeline expects batches to be sorted by.
    pub fn sort_key(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    /// Whether this operation is entirely inside `[begin, end)`.
    pub fn is_within(&self, begin: usize, end: usize) -> bool {
        begin <= self.begin && self.end <= end
    }

    /// Whether this operation is not entirely outside `[begin, end)`.
    ///
    /// Touching a boundary counts as outside. A zero-width operation is
    /// inside only when it sits strictly between the bounds.
    pub fn intersects(&self, begin: usize, end: usize) -> bool {
        if self.begin == self.end {
            begin < self.begin && self.begin < end
        } else {
            self.begin < end && self.end > begin
        }
    }

    /// Check the operation against the text it will be applied to.
    ///
    /// Cuts may extend past the end of the text; they are clipped later.
    pub fn validate(&self, text: &str) -> Result<(), OperationError> {
        let text_len = text.len();
        let in_bounds = match self.kind {
            OperationKind::Cut => true,
            _ => self.end <= text_len,
        };

        if self.begin > self.end || !in_bounds {
            return Err(OperationError::InvalidRange {
                kind: self.kind,
                begin: self.begin,
                end: self.end,
                text_len,
            });
        }

        for offset in [self.begin, self.end] {
            if offset <= text_len && !text.is_char_boundary(offset) {
                return Err(OperationError::NotCharBoundary {
                    kind: self.kind,
                    offset,
                });
            }
        }

        if self.kind.requires_value() && self.value.is_none() {
            return Err(OperationError::MissingValue {
                kind: self.kind,
                begin: self.begin,
                end: self.end,
            });
        }

        Ok(())
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}-{}]", self.kind, self.begin, self.end)?;
        if let Some(value) = &self.value {
            write!(f, ": {value:?}")?;
        }
        Ok(())
    }
}

/// An operation that failed validation and was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedOperation {
    /// Position of the operation in the submitted batch
    pub index: usize,
    pub operation: EditOperation,
    #[serde(serialize_with = "serialize_display")]
    pub error: OperationError,
}

fn serialize_display<S>(error: &OperationError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(error)
}

impl fmt::Display for RejectedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change #{} ({}) rejected: {}", self.index, self.operation, self.error)
    }
}
