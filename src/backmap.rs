//! Map spans found in a transformed view back to the view it came from.

use crate::aligned::AlignmentError;
use crate::registry::{AlignmentKey, AlignmentRegistry, DocumentId};
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackmapError {
    #[error("No alignment available for {key}")]
    NoAlignment { key: AlignmentKey },

    #[error("View chain needs at least two views, got {0}")]
    ShortChain(usize),

    #[error("Cannot map span through {key}: {source}")]
    Alignment {
        key: AlignmentKey,
        #[source]
        source: AlignmentError,
    },
}

/// Back-maps spans of one document through alignments in a registry.
#[derive(Debug, Clone, Copy)]
pub struct Backmapper<'a> {
    registry: &'a AlignmentRegistry,
}

impl<'a> Backmapper<'a> {
    pub fn new(registry: &'a AlignmentRegistry) -> Self {
        Self { registry }
    }

    /// Map spans of `target_view` to `source_view`.
    pub fn backmap(
        &self,
        document: &DocumentId,
        source_view: &str,
        target_view: &str,
        spans: &[Range<usize>],
    ) -> Result<Vec<Range<usize>>, BackmapError> {
        let key = AlignmentKey::new(document.clone(), source_view, target_view);
        let aligned = self
            .registry
            .lookup(&key)
            .ok_or_else(|| BackmapError::NoAlignment { key: key.clone() })?;

        spans
            .iter()
            .map(|span| {
                aligned
                    .resolve_to_original(span.clone())
                    .map_err(|source| BackmapError::Alignment {
                        key: key.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Map spans of the last view in `chain` back to the first.
    ///
    /// `chain` lists views in the order they were produced, e.g.
    /// `["source", "normalized", "target"]`; every neighbouring pair must
    /// have a registered alignment.
    pub fn backmap_chain(
        &self,
        document: &DocumentId,
        chain: &[&str],
        spans: &[Range<usize>],
    ) -> Result<Vec<Range<usize>>, BackmapError> {
        if chain.len() < 2 {
            return Err(BackmapError::ShortChain(chain.len()));
        }

        let mut spans = spans.to_vec();
        for pair in chain.windows(2).rev() {
            spans = self.backmap(document, pair[0], pair[1], &spans)?;
        }
        Ok(spans)
    }
}
