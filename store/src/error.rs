//! Error types for store, configuration and orchestration operations.

use schema_index_dump::DumpError;
use thiserror::Error;

/// Errors that can occur while loading the store or its settings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dump could not be parsed.
    #[error("dump error: {0}")]
    Dump(#[from] DumpError),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Settings are structurally valid YAML but unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
