//! kustprep core library: manifest identity, workflow state, configuration.
//!
//! - [`types`]: identity, list and kustomization documents
//! - [`manifest`]: identity derivation and generated file names
//! - [`state`]: list metadata persistence ([`StateManager`])
//! - [`config`]: workflow step and pipeline options
//! - [`error`]: [`StateError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod manifest;
pub mod state;
pub mod types;

pub use config::{KustomizeStep, NonYamlPolicy, PipelineOptions};
pub use error::{ConfigError, StateError};
pub use manifest::{generate_name_from_metadata, is_kustomization, is_yaml_path, KUSTOMIZATION_FILE};
pub use state::{FileState, MemoryState, StateFile, StateManager};
pub use types::{
    Kustomization, ListK8sYaml, ListRecord, MinimalK8sMetadata, MinimalK8sYaml, CRD_KIND,
    LIST_KIND,
};
