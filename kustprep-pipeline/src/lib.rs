//! # kustprep-pipeline
//!
//! Prepares a directory of Kubernetes manifests for a kustomize overlay,
//! builds the overlay, and writes the results back over the original files.
//!
//! Build a [`Kustomizer`] around an [`OverlayBuilder`] and call
//! [`Kustomizer::pre_execute`]; the individual phases are public too.

pub mod base;
pub mod error;
mod fsutil;
pub mod overlay;
pub mod paths;
pub mod pipeline;
pub mod reconcile;
pub mod resolver;
pub mod split;

pub use error::{ErrorCategory, PipelineError};
pub use overlay::{BuildError, BuiltResource, BuiltResources, KustomizeCli, OverlayBuilder};
pub use pipeline::{CancelToken, Kustomizer, Phase, PreExecuteReport};
pub use reconcile::ReplaceOutcome;
pub use resolver::{contains_base, BaseResolution};
pub use split::SplitOutcome;
