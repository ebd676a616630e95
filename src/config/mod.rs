pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    ChangeSetConfig, Metadata, ValidationError, ValidationIssue, VerifyError,
    DEFAULT_SOURCE_VIEW, DEFAULT_TARGET_VIEW,
};
