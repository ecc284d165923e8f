//! Workflow step and pipeline options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The fields of a kustomize workflow step that the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KustomizeStep {
    /// Base directory of manifests to prepare.
    pub base: PathBuf,
    /// Directory of strategic-merge patches applied on top of the base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<PathBuf>,
    /// Where built resources are written, one file each.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
}

impl KustomizeStep {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overlay: None,
            dest: None,
        }
    }
}

/// What the splitters do when they meet a non-YAML file in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonYamlPolicy {
    /// Stop processing the rest of that directory.
    #[default]
    StopDirectory,
    /// Skip only the offending file.
    SkipFile,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub non_yaml: NonYamlPolicy,
    /// Run the multi-document split before the list split.
    pub split_multidoc: bool,
    /// Parent directory for temporary overlay working directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            non_yaml: NonYamlPolicy::default(),
            split_multidoc: true,
            temp_root: None,
        }
    }
}

impl PipelineOptions {
    /// Load options from a YAML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_reproduce_directory_short_circuit() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.non_yaml, NonYamlPolicy::StopDirectory);
        assert!(opts.split_multidoc);
        assert!(opts.temp_root.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kustprep.yaml");
        std::fs::write(&path, "non_yaml: skip_file\n").unwrap();
        let opts = PipelineOptions::load(&path).unwrap();
        assert_eq!(opts.non_yaml, NonYamlPolicy::SkipFile);
        assert!(opts.split_multidoc);
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kustprep.yaml");
        std::fs::write(&path, "non_yaml: explode\n").unwrap();
        let err = PipelineOptions::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn step_deserializes_without_optionals() {
        let step: KustomizeStep = serde_yaml::from_str("base: installer/base\n").unwrap();
        assert_eq!(step, KustomizeStep::new("installer/base"));
    }
}
