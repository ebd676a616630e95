//! Change-set loading: TOML in, validated [`ChangeSetConfig`] out.

use crate::config::schema::{ChangeSetConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read change set {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed change set{}: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid change set{}: {source}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

/// Parse and validate change-set TOML that did not come from a file.
pub fn load_from_str(input: &str) -> Result<ChangeSetConfig, ConfigError> {
    parse(input, None)
}

/// Read, parse and validate the change-set file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ChangeSetConfig, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&input, Some(path))
}

fn parse(input: &str, path: Option<&Path>) -> Result<ChangeSetConfig, ConfigError> {
    let owned = || path.map(Path::to_path_buf);
    let config: ChangeSetConfig = toml_edit::de::from_str(input).map_err(|source| {
        ConfigError::Toml {
            path: owned(),
            source,
        }
    })?;
    config.validate().map_err(|source| ConfigError::Validation {
        path: owned(),
        source,
    })?;
    tracing::debug!(changes = config.changes.len(), "loaded change set");
    Ok(config)
}
