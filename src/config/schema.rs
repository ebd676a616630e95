use crate::operation::EditOperation;
use crate::registry::{AlignmentKey, DocumentId};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use xxhash_rust::xxh3::xxh3_64;

pub const DEFAULT_SOURCE_VIEW: &str = "source";
pub const DEFAULT_TARGET_VIEW: &str = "target";

/// A batch of changes for one document, as read from a change-set file.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ChangeSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub changes: Vec<EditOperation>,
}

impl ChangeSetConfig {
    /// Check the metadata. Individual changes are validated by the pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Some(id) = &self.meta.document_id {
            if id.trim().is_empty() {
                issues.push(ValidationIssue::EmptyField("meta.document_id"));
            }
        }
        if self.meta.source_view.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField("meta.source_view"));
        }
        if self.meta.target_view.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField("meta.target_view"));
        }
        if !self.meta.source_view.is_empty() && self.meta.source_view == self.meta.target_view {
            issues.push(ValidationIssue::SameView(self.meta.source_view.clone()));
        }
        if let Some(hash) = &self.meta.expected_hash {
            if u64::from_str_radix(hash, 16).is_err() {
                issues.push(ValidationIssue::BadHash(hash.clone()));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Changes in the `(begin, end)` order the pipeline requires.
    pub fn sorted_operations(&self) -> Vec<EditOperation> {
        let mut changes = self.changes.clone();
        changes.sort_by_key(EditOperation::sort_key);
        changes
    }

    /// Registry key for the document `text` belongs to.
    pub fn alignment_key(&self, text: &str) -> AlignmentKey {
        AlignmentKey::new(
            self.meta.document_id(text),
            self.meta.source_view.as_str(),
            self.meta.target_view.as_str(),
        )
    }

    /// Registry key for `text` read from `source`.
    pub fn alignment_key_for(&self, source: &Path, text: &str) -> AlignmentKey {
        AlignmentKey::new(
            self.meta.document_id_for(source, text),
            self.meta.source_view.as_str(),
            self.meta.target_view.as_str(),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default = "default_source_view")]
    pub source_view: String,
    #[serde(default = "default_target_view")]
    pub target_view: String,
    /// xxh3-64 of the source text, hex
    #[serde(default)]
    pub expected_hash: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            document_id: None,
            source_view: default_source_view(),
            target_view: default_target_view(),
            expected_hash: None,
        }
    }
}

impl Metadata {
    pub fn document_id(&self, text: &str) -> DocumentId {
        match &self.document_id {
            Some(id) => DocumentId::new(id.as_str()),
            None => DocumentId::fingerprint(text),
        }
    }

    /// Like [`Metadata::document_id`], but falls back to the source path so
    /// two files with the same text get different identities.
    pub fn document_id_for(&self, source: &Path, text: &str) -> DocumentId {
        match &self.document_id {
            Some(id) => DocumentId::new(id.as_str()),
            None => DocumentId::for_source(source, text),
        }
    }

    /// Check `text` against `expected_hash`, if one is configured.
    pub fn verify_source(&self, text: &str) -> Result<(), VerifyError> {
        let Some(expected) = &self.expected_hash else {
            return Ok(());
        };
        let actual = xxh3_64(text.as_bytes());
        match u64::from_str_radix(expected, 16) {
            Ok(expected) if expected == actual => Ok(()),
            _ => Err(VerifyError {
                expected: expected.clone(),
                actual: format!("{actual:016x}"),
            }),
        }
    }
}

fn default_source_view() -> String {
    DEFAULT_SOURCE_VIEW.to_string()
}

fn default_target_view() -> String {
    DEFAULT_TARGET_VIEW.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source text hash mismatch: expected {}, found {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for VerifyError {}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyField(&'static str),
    SameView(String),
    BadHash(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyField(field) => write!(f, "field '{field}' must not be empty"),
            ValidationIssue::SameView(view) => {
                write!(f, "source and target view are both '{view}'")
            }
            ValidationIssue::BadHash(hash) => {
                write!(f, "expected_hash '{hash}' is not a hexadecimal xxh3 hash")
            }
        }
    }
}
