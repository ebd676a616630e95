//! Store of finished alignments, keyed by document and view pair.
//!
//! One registry is created per run and shared by every pipeline that
//! processes documents in that run. Registered alignments are frozen behind
//! an [`Arc`] and can be queried from any number of threads.

use crate::aligned::AlignedString;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Identity of one document within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identity from the document text (xxh3-64, hex).
    pub fn fingerprint(text: &str) -> Self {
        Self(format!("{:016x}", xxh3_64(text.as_bytes())))
    }

    /// Identity of a document read from `path`: the path plus the text
    /// fingerprint, so equal texts in different files stay distinct.
    pub fn for_source(path: &Path, text: &str) -> Self {
        Self(format!("{}@{:016x}", path.display(), xxh3_64(text.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// `(document, source view, target view)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AlignmentKey {
    pub document: DocumentId,
    pub source_view: String,
    pub target_view: String,
}

impl AlignmentKey {
    pub fn new(
        document: impl Into<DocumentId>,
        source_view: impl Into<String>,
        target_view: impl Into<String>,
    ) -> Self {
        Self {
            document: document.into(),
            source_view: source_view.into(),
            target_view: target_view.into(),
        }
    }
}

impl fmt::Display for AlignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.document, self.source_view, self.target_view
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Alignment already registered for {0}")]
    AlreadyRegistered(AlignmentKey),
}

/// Thread-safe, cheaply clonable handle to the alignments of one run.
#[derive(Debug, Clone, Default)]
pub struct AlignmentRegistry {
    entries: Arc<RwLock<HashMap<AlignmentKey, Arc<AlignedString>>>>,
}

impl AlignmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze and store an alignment.
    ///
    /// Entries are never replaced; registering a key twice is an error.
    pub fn register(
        &self,
        key: AlignmentKey,
        aligned: AlignedString,
    ) -> Result<Arc<AlignedString>, RegistryError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        let aligned = Arc::new(aligned);
        tracing::debug!(%key, "registered alignment");
        entries.insert(key, Arc::clone(&aligned));
        Ok(aligned)
    }

    /// `None` means no alignment is available for this key.
    pub fn lookup(&self, key: &AlignmentKey) -> Option<Arc<AlignedString>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &AlignmentKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drop every alignment of `document`, returning how many were removed.
    pub fn release_document(&self, document: &DocumentId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| &key.document != document);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
