//! Edit Align: apply offset-based change batches and keep the alignment
//!
//! A batch of declarative changes (insert, replace, delete, cut) recorded
//! against a document's text is applied in one pass. The result is the
//! transformed text plus an [`AlignedString`] that translates offsets
//! between the original and transformed text in both directions, so spans
//! found in the transformed text can be mapped back.
//!
//! # Pipeline
//!
//! 1. Validation: malformed changes are rejected one by one
//! 2. Cut normalization ([`cut`]): cuts become deletes and erase every other
//!    change they overlap
//! 3. Selection ([`select`]): the earliest, longest change wins; execution
//!    runs right to left so unprocessed offsets stay valid
//! 4. Application to an [`AlignedString`]
//! 5. Optional registration in an [`AlignmentRegistry`] for later
//!    back-mapping with a [`Backmapper`]
//!
//! Batches must be sorted by `(begin, end)` ascending.
//!
//! # Example
//!
//! ```
//! use edit_align::{apply_changes, EditOperation};
//!
//! let changes = vec![
//!     EditOperation::insert(0, "XY"),
//!     EditOperation::delete(2, 5),
//! ];
//! let result = apply_changes("ABCDEFGHIJ", &changes).unwrap();
//!
//! assert_eq!(result.text(), "XYABFGHIJ");
//! assert_eq!(result.aligned.translate_to_original(4), Ok(Some(5)));
//! ```

pub mod aligned;
pub mod backmap;
pub mod config;
pub mod cut;
pub mod operation;
pub mod pipeline;
pub mod registry;
pub mod select;

// Re-exports
pub use aligned::{AlignedString, AlignmentError, Chunk};
pub use backmap::{BackmapError, Backmapper};
pub use config::{load_from_path, load_from_str, ChangeSetConfig, ConfigError};
pub use cut::{normalize_cuts, CutNormalizer, Normalized};
pub use operation::{EditOperation, OperationError, OperationKind, RejectedOperation};
pub use pipeline::{apply_and_register, apply_changes, ChangeReport, PipelineError, Transformation};
pub use registry::{AlignmentKey, AlignmentRegistry, DocumentId, RegistryError};
pub use select::{select, Selection};
