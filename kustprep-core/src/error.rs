//! Error types for kustprep-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or saving the workflow state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// Underlying I/O failure, with the path that was being touched.
    #[error("state I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("state YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The state file exists but is not valid YAML for [`crate::StateFile`].
    #[error("failed to parse state at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised while loading [`crate::PipelineOptions`] from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
