//! Error types for kustprep-pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use kustprep_core::{MinimalK8sYaml, StateError};

use crate::overlay::BuildError;
use crate::pipeline::Phase;

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Needs a manual fix of the inputs (multi-base, identity conflicts, ...).
    Configuration,
    Io,
    Parse,
    Build,
    State,
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Io => "io",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Build => "build",
            ErrorCategory::State => "state",
            ErrorCategory::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// All errors that can arise from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem failure; `op` names what was being attempted.
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML (un)marshalling failure.
    #[error("{op} {path}: {source}")]
    Yaml {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to walk base path {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{path}: kustomization.yaml files with multiple bases are not yet supported ({count} bases declared)")]
    MultipleBases { path: PathBuf, count: usize },

    #[error("base directory {path} contains no resources")]
    EmptyBase { path: PathBuf },

    #[error("resource {identity} appears in both {first} and {second}")]
    IdentityConflict {
        identity: MinimalK8sYaml,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("serialize list metadata: {0}")]
    State(#[from] StateError),

    #[error("cancelled before {phase}")]
    Cancelled { phase: Phase },

    /// A failure wrapped with the pipeline phase it happened in.
    #[error("{phase}: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Io { .. } | PipelineError::Walk { .. } => ErrorCategory::Io,
            PipelineError::Yaml { .. } => ErrorCategory::Parse,
            PipelineError::MultipleBases { .. }
            | PipelineError::EmptyBase { .. }
            | PipelineError::IdentityConflict { .. } => ErrorCategory::Configuration,
            PipelineError::Build(_) => ErrorCategory::Build,
            PipelineError::State(_) => ErrorCategory::State,
            PipelineError::Cancelled { .. } => ErrorCategory::Cancelled,
            PipelineError::Phase { source, .. } => source.category(),
        }
    }

    /// The innermost error, with every [`PipelineError::Phase`] layer removed.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn in_phase(self, phase: Phase) -> PipelineError {
        PipelineError::Phase {
            phase,
            source: Box::new(self),
        }
    }
}

/// Convenience constructor for [`PipelineError::Io`].
pub(crate) fn io_err(
    op: &'static str,
    path: impl Into<PathBuf>,
    source: std::io::Error,
) -> PipelineError {
    PipelineError::Io {
        op,
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`PipelineError::Yaml`].
pub(crate) fn yaml_err(
    op: &'static str,
    path: impl Into<PathBuf>,
    source: serde_yaml::Error,
) -> PipelineError {
    PipelineError::Yaml {
        op,
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`PipelineError::Walk`].
pub(crate) fn walk_err(path: impl Into<PathBuf>, source: walkdir::Error) -> PipelineError {
    PipelineError::Walk {
        path: path.into(),
        source,
    }
}
