//! Text with a chunk-level record of its provenance.
//!
//! An [`AlignedString`] starts as a single chunk spanning the untouched
//! original text. Every insert, delete or replace rewrites the chunk list so
//! that each run of the current text is either a view into the original
//! ([`Chunk::Original`]) or text that was inserted ([`Chunk::Inserted`]).
//! Offset translation walks the chunk list; the original text itself is
//! never modified.
//!
//! All offsets are byte offsets and must fall on UTF-8 character boundaries.

use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// A maximal run of the current text with a single provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Chunk {
    /// Unmodified text, `range` indexes the original.
    Original { range: Range<usize> },
    /// Text with no counterpart in the original.
    Inserted { text: String },
}

impl Chunk {
    pub fn len(&self) -> usize {
        match self {
            Chunk::Original { range } => range.len(),
            Chunk::Inserted { text } => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_original(&self) -> bool {
        matches!(self, Chunk::Original { .. })
    }

    /// Sub-chunk for a range relative to the start of this chunk.
    fn slice(&self, relative: Range<usize>) -> Chunk {
        match self {
            Chunk::Original { range } => Chunk::Original {
                range: range.start + relative.start..range.start + relative.end,
            },
            Chunk::Inserted { text } => Chunk::Inserted {
                text: text[relative].to_string(),
            },
        }
    }

    /// Absorb `next` into `self` if the two form one contiguous run.
    fn try_merge(&mut self, next: &Chunk) -> bool {
        match (self, next) {
            (Chunk::Original { range }, Chunk::Original { range: following })
                if range.end == following.start =>
            {
                range.end = following.end;
                true
            }
            (Chunk::Inserted { text }, Chunk::Inserted { text: following }) => {
                text.push_str(following);
                true
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("Offset {offset} out of bounds for text of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("Invalid range: [{begin}, {end}) in text of length {len}")]
    InvalidRange { begin: usize, end: usize, len: usize },

    #[error("Offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },
}

/// Original text plus the chunk list describing the current text.
///
/// Invariants:
/// - concatenating chunk texts yields the current text
/// - original ranges of [`Chunk::Original`] chunks are disjoint and increasing
/// - no chunk is empty and no two neighbours could be merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedString {
    original: String,
    chunks: Vec<Chunk>,
    len: usize,
}

impl AlignedString {
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        let len = original.len();
        let chunks = if len == 0 {
            Vec::new()
        } else {
            vec![Chunk::Original { range: 0..len }]
        };
        Self {
            original,
            chunks,
            len,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Length of the current text in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The current text.
    pub fn get(&self) -> String {
        let mut text = String::with_capacity(self.len);
        for chunk in &self.chunks {
            text.push_str(self.chunk_text(chunk));
        }
        text
    }

    /// The current text in `range`.
    pub fn get_range(&self, range: Range<usize>) -> Result<String, AlignmentError> {
        self.check_range(range.start, range.end)?;
        let mut text = String::with_capacity(range.len());
        for (span, chunk) in self.spans() {
            let lo = span.start.max(range.start);
            let hi = span.end.min(range.end);
            if lo < hi {
                let chunk_text = self.chunk_text(chunk);
                text.push_str(&chunk_text[lo - span.start..hi - span.start]);
            }
        }
        Ok(text)
    }

    /// Insert `text` at current offset `at`.
    pub fn insert(&mut self, at: usize, text: &str) -> Result<(), AlignmentError> {
        if at > self.len {
            return Err(AlignmentError::OffsetOutOfBounds {
                offset: at,
                len: self.len,
            });
        }
        self.check_boundary(at)?;
        self.splice(at, at, text);
        Ok(())
    }

    /// Remove the current span `[begin, end)`.
    pub fn delete(&mut self, begin: usize, end: usize) -> Result<(), AlignmentError> {
        self.check_range(begin, end)?;
        self.splice(begin, end, "");
        Ok(())
    }

    /// Replace the current span `[begin, end)` with `text` in one update.
    pub fn replace(&mut self, begin: usize, end: usize, text: &str) -> Result<(), AlignmentError> {
        self.check_range(begin, end)?;
        self.splice(begin, end, text);
        Ok(())
    }

    /// Original offset of the character at current offset `offset`.
    ///
    /// Returns `Ok(None)` when the character was inserted.
    pub fn translate_to_original(&self, offset: usize) -> Result<Option<usize>, AlignmentError> {
        if offset >= self.len {
            return Err(AlignmentError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }
        for (span, chunk) in self.spans() {
            if span.contains(&offset) {
                return Ok(match chunk {
                    Chunk::Original { range } => Some(range.start + offset - span.start),
                    Chunk::Inserted { .. } => None,
                });
            }
        }
        Ok(None)
    }

    /// Current offset of the character at original offset `offset`.
    ///
    /// Returns `Ok(None)` when the character was deleted.
    pub fn translate_to_current(&self, offset: usize) -> Result<Option<usize>, AlignmentError> {
        if offset >= self.original.len() {
            return Err(AlignmentError::OffsetOutOfBounds {
                offset,
                len: self.original.len(),
            });
        }
        for (span, chunk) in self.spans() {
            if let Chunk::Original { range } = chunk {
                if range.contains(&offset) {
                    return Ok(Some(span.start + offset - range.start));
                }
                if range.start > offset {
                    break;
                }
            }
        }
        Ok(None)
    }

    /// Map a span of the current text back to the original.
    ///
    /// The result covers every original character inside the span, plus any
    /// deleted text between them. Inserted text at the edges contributes the
    /// original range it replaced, so a pure insertion maps to a zero-width
    /// range and a replacement maps to the text it replaced. An empty span
    /// at a deletion point maps to the deleted range.
    pub fn resolve_to_original(&self, range: Range<usize>) -> Result<Range<usize>, AlignmentError> {
        self.check_bounds(range.start, range.end, self.len)?;
        let (begin, end) = if range.is_empty() {
            ordered(
                self.original_lower(range.start),
                self.original_upper(range.start),
            )
        } else {
            (
                self.original_lower(range.start),
                self.original_upper(range.end),
            )
        };
        Ok(begin..end)
    }

    /// Map a span of the original text to the current text.
    ///
    /// Deleted characters at the edges are skipped; a span lying entirely in
    /// deleted text maps to whatever now stands in its place (zero-width for
    /// a pure deletion).
    pub fn resolve_to_current(&self, range: Range<usize>) -> Result<Range<usize>, AlignmentError> {
        self.check_bounds(range.start, range.end, self.original.len())?;
        let (begin, end) = if range.is_empty() {
            ordered(
                self.current_lower(range.start),
                self.current_upper(range.start),
            )
        } else {
            (
                self.current_lower(range.start),
                self.current_upper(range.end),
            )
        };
        Ok(begin..end)
    }

    /// Original ranges that no longer appear in the current text.
    pub fn deleted_ranges(&self) -> Vec<Range<usize>> {
        let mut deleted = Vec::new();
        let mut previous_end = 0;
        for chunk in &self.chunks {
            if let Chunk::Original { range } = chunk {
                if range.start > previous_end {
                    deleted.push(previous_end..range.start);
                }
                previous_end = range.end;
            }
        }
        if previous_end < self.original.len() {
            deleted.push(previous_end..self.original.len());
        }
        deleted
    }

    /// Current ranges occupied by inserted text.
    pub fn inserted_ranges(&self) -> Vec<Range<usize>> {
        self.spans()
            .filter(|(_, chunk)| !chunk.is_original())
            .map(|(span, _)| span)
            .collect()
    }

    fn chunk_text<'a>(&'a self, chunk: &'a Chunk) -> &'a str {
        match chunk {
            Chunk::Original { range } => &self.original[range.clone()],
            Chunk::Inserted { text } => text,
        }
    }

    /// Chunks paired with the current range each one occupies.
    fn spans(&self) -> impl Iterator<Item = (Range<usize>, &Chunk)> + '_ {
        self.chunks.iter().scan(0, |position, chunk| {
            let start = *position;
            *position += chunk.len();
            Some((start..*position, chunk))
        })
    }

    /// Rebuild the chunk list with `[begin, end)` replaced by `text`.
    ///
    /// Callers validate the range first.
    fn splice(&mut self, begin: usize, end: usize, text: &str) {
        let mut chunks = Vec::with_capacity(self.chunks.len() + 2);

        for (span, chunk) in self.spans() {
            if span.start < begin {
                push_chunk(&mut chunks, chunk.slice(0..span.end.min(begin) - span.start));
            }
        }
        if !text.is_empty() {
            push_chunk(
                &mut chunks,
                Chunk::Inserted {
                    text: text.to_string(),
                },
            );
        }
        for (span, chunk) in self.spans() {
            if span.end > end {
                push_chunk(
                    &mut chunks,
                    chunk.slice(span.start.max(end) - span.start..span.len()),
                );
            }
        }

        self.chunks = chunks;
        self.len = self.len - (end - begin) + text.len();
    }

    fn check_bounds(&self, begin: usize, end: usize, len: usize) -> Result<(), AlignmentError> {
        if begin > end || end > len {
            return Err(AlignmentError::InvalidRange { begin, end, len });
        }
        Ok(())
    }

    fn check_range(&self, begin: usize, end: usize) -> Result<(), AlignmentError> {
        self.check_bounds(begin, end, self.len)?;
        self.check_boundary(begin)?;
        self.check_boundary(end)
    }

    fn check_boundary(&self, offset: usize) -> Result<(), AlignmentError> {
        for (span, chunk) in self.spans() {
            if span.start < offset && offset < span.end {
                if self.chunk_text(chunk).is_char_boundary(offset - span.start) {
                    return Ok(());
                }
                return Err(AlignmentError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }

    /// Original position at which current offset `pos` starts.
    fn original_lower(&self, pos: usize) -> usize {
        let mut anchor = 0;
        for (span, chunk) in self.spans() {
            if span.start > pos {
                break;
            }
            if let Chunk::Original { range } = chunk {
                if pos < span.end {
                    return range.start + pos - span.start;
                }
                anchor = range.end;
            }
        }
        anchor
    }

    /// Original position at which current offset `pos` ends.
    fn original_upper(&self, pos: usize) -> usize {
        for (span, chunk) in self.spans() {
            if let Chunk::Original { range } = chunk {
                if span.start < pos && pos <= span.end {
                    return range.start + pos - span.start;
                }
                if span.start >= pos {
                    return range.start;
                }
            }
        }
        self.original.len()
    }

    /// Current position at which original offset `pos` starts.
    fn current_lower(&self, pos: usize) -> usize {
        let mut anchor = 0;
        for (span, chunk) in self.spans() {
            if let Chunk::Original { range } = chunk {
                if range.start > pos {
                    break;
                }
                if pos < range.end {
                    return span.start + pos - range.start;
                }
                anchor = span.end;
            }
        }
        anchor
    }

    /// Current position at which original offset `pos` ends.
    fn current_upper(&self, pos: usize) -> usize {
        for (span, chunk) in self.spans() {
            if let Chunk::Original { range } = chunk {
                if range.start < pos && pos <= range.end {
                    return span.start + pos - range.start;
                }
                if range.start >= pos {
                    return span.start;
                }
            }
        }
        self.len
    }
}

impl fmt::Display for AlignedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            f.write_str(self.chunk_text(chunk))?;
        }
        Ok(())
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, chunk: Chunk) {
    if chunk.is_empty() {
        return;
    }
    if let Some(last) = chunks.last_mut() {
        if last.try_merge(&chunk) {
            return;
        }
    }
    chunks.push(chunk);
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
