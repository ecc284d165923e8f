//! Overlay build boundary.
//!
//! The pipeline never applies patches itself. It stages a directory holding a
//! `kustomization.yaml`, hands that directory to an [`OverlayBuilder`], and
//! gets back the merged resources.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

use kustprep_core::{Kustomization, MinimalK8sYaml, KUSTOMIZATION_FILE};

use crate::base::should_add_file_to_base;
use crate::error::{io_err, yaml_err, PipelineError};
use crate::fsutil::{sorted_entries, write_with_mode, NEW_FILE_MODE};
use crate::paths;

// ---------------------------------------------------------------------------
// Builder capability
// ---------------------------------------------------------------------------

/// Errors reported by an [`OverlayBuilder`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} build {dir} exited with {status}: {stderr}")]
    Failed {
        program: String,
        dir: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unparseable build output: {0}")]
    Output(#[source] serde_yaml::Error),
}

/// One resource as produced by the overlay build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltResource {
    pub minimal: MinimalK8sYaml,
    pub full: serde_yaml::Value,
}

impl BuiltResource {
    pub fn from_value(full: serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        let minimal = MinimalK8sYaml::from_value(&full)?;
        Ok(Self { minimal, full })
    }
}

/// Builds the overlay staged in a directory.
pub trait OverlayBuilder {
    fn build(&self, dir: &Path) -> Result<Vec<BuiltResource>, BuildError>;
}

impl<B: OverlayBuilder + ?Sized> OverlayBuilder for &B {
    fn build(&self, dir: &Path) -> Result<Vec<BuiltResource>, BuildError> {
        (**self).build(dir)
    }
}

impl<B: OverlayBuilder + ?Sized> OverlayBuilder for Box<B> {
    fn build(&self, dir: &Path) -> Result<Vec<BuiltResource>, BuildError> {
        (**self).build(dir)
    }
}

/// Parse a `---`-separated stream of built resources. Null documents are skipped.
pub fn parse_built_output(text: &str) -> Result<Vec<BuiltResource>, serde_yaml::Error> {
    let mut resources = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(doc)?;
        if value.is_null() {
            continue;
        }
        resources.push(BuiltResource::from_value(value)?);
    }
    Ok(resources)
}

// ---------------------------------------------------------------------------
// BuiltResources
// ---------------------------------------------------------------------------

/// Built resources keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct BuiltResources {
    by_identity: BTreeMap<MinimalK8sYaml, BuiltResource>,
}

impl BuiltResources {
    /// Index `resources` by identity.
    ///
    /// Two resources with the same identity would make the lookup ambiguous,
    /// so that is an [`PipelineError::IdentityConflict`].
    pub fn from_resources(resources: Vec<BuiltResource>) -> Result<Self, PipelineError> {
        let mut by_identity = BTreeMap::new();
        let mut positions = BTreeMap::new();
        for (idx, resource) in resources.into_iter().enumerate() {
            if let Some(first) = positions.insert(resource.minimal.clone(), idx) {
                return Err(PipelineError::IdentityConflict {
                    identity: resource.minimal,
                    first: format!("built document {first}"),
                    second: format!("built document {idx}"),
                });
            }
            by_identity.insert(resource.minimal.clone(), resource);
        }
        Ok(Self { by_identity })
    }

    pub fn get(&self, identity: &MinimalK8sYaml) -> Option<&BuiltResource> {
        self.by_identity.get(identity)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Resources in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &BuiltResource> {
        self.by_identity.values()
    }
}

// ---------------------------------------------------------------------------
// kustomize CLI adapter
// ---------------------------------------------------------------------------

/// [`OverlayBuilder`] that runs `<program> build <dir>`.
#[derive(Debug, Clone)]
pub struct KustomizeCli {
    program: PathBuf,
}

impl KustomizeCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for KustomizeCli {
    fn default() -> Self {
        Self::new("kustomize")
    }
}

impl OverlayBuilder for KustomizeCli {
    fn build(&self, dir: &Path) -> Result<Vec<BuiltResource>, BuildError> {
        let program = self.program.display().to_string();
        tracing::debug!("running {program} build {}", dir.display());
        let output = Command::new(&self.program)
            .arg("build")
            .arg(dir)
            .output()
            .map_err(|source| BuildError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BuildError::Failed {
                program,
                dir: dir.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_built_output(&String::from_utf8_lossy(&output.stdout)).map_err(BuildError::Output)
    }
}

// ---------------------------------------------------------------------------
// Temporary overlay directory
// ---------------------------------------------------------------------------

/// Working directory for one overlay build; removed when dropped.
#[derive(Debug)]
pub struct TempOverlayDir {
    dir: tempfile::TempDir,
}

impl TempOverlayDir {
    /// Create a fresh directory under `root`, or the OS temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("kustprep-overlay-");
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|e| io_err("create temp root", root, e))?;
                builder
                    .tempdir_in(root)
                    .map_err(|e| io_err("create temp overlay dir in", root, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| io_err("create temp overlay dir in", std::env::temp_dir(), e))?,
        };
        tracing::debug!("created temp overlay dir {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for TempOverlayDir {
    fn drop(&mut self) {
        tracing::debug!("removing temp overlay dir {}", self.dir.path().display());
    }
}

/// Stage the overlay `kustomization.yaml` in `temp`.
///
/// It names `base` (as a path relative to `temp`) as its only base. When an
/// `overlay` directory exists, its YAML files are copied next to it and listed
/// as strategic-merge patches.
pub fn write_overlay(
    temp: &Path,
    base: &Path,
    overlay: Option<&Path>,
) -> Result<PathBuf, PipelineError> {
    let base_abs = fs::canonicalize(base).map_err(|e| io_err("resolve base", base, e))?;
    let temp_abs = fs::canonicalize(temp).map_err(|e| io_err("resolve temp overlay dir", temp, e))?;

    let mut kustomization = Kustomization {
        bases: vec![slash_path(&paths::relative_to(&temp_abs, &base_abs))],
        ..Kustomization::default()
    };

    if let Some(overlay) = overlay.filter(|o| o.is_dir()) {
        for entry in sorted_entries(overlay)? {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| io_err("stat", &path, e))?
                .is_file();
            if !is_file || !should_add_file_to_base(&[], &path) {
                continue;
            }
            let name = entry.file_name();
            fs::copy(&path, temp.join(&name)).map_err(|e| io_err("copy patch", &path, e))?;
            kustomization
                .patches_strategic_merge
                .push(name.to_string_lossy().into_owned());
        }
    }

    let target = temp.join(KUSTOMIZATION_FILE);
    let yaml = serde_yaml::to_string(&kustomization)
        .map_err(|e| yaml_err("marshal overlay kustomization", &target, e))?;
    write_with_mode("write overlay kustomization", &target, yaml.as_bytes(), NEW_FILE_MODE)?;
    Ok(target)
}

/// Render a relative path with `/` separators, as kustomization files expect.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STREAM: &str = "\
apiVersion: v1
kind: Service
metadata:
  name: web
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 3
---
";

    #[test]
    fn parses_multi_document_output() {
        let built = parse_built_output(STREAM).unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(built[1].minimal, MinimalK8sYaml::new("apps/v1", "Deployment", "web", ""));
        assert_eq!(built[1].full["spec"]["replicas"].as_u64(), Some(3));
    }

    #[test]
    fn duplicate_built_identity_is_conflict() {
        let mut built = parse_built_output(STREAM).unwrap();
        built.push(built[0].clone());
        let err = BuiltResources::from_resources(built).unwrap_err();
        assert!(matches!(err, PipelineError::IdentityConflict { .. }), "got: {err}");
    }

    #[test]
    fn lookup_by_identity() {
        let built = BuiltResources::from_resources(parse_built_output(STREAM).unwrap()).unwrap();
        assert_eq!(built.len(), 2);
        assert!(built.get(&MinimalK8sYaml::new("v1", "Service", "web", "")).is_some());
        assert!(built.get(&MinimalK8sYaml::new("v1", "Service", "api", "")).is_none());
    }

    #[test]
    fn temp_dir_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let temp = TempOverlayDir::create(Some(root.path())).unwrap();
        let path = temp.path().to_path_buf();
        assert!(path.is_dir());
        drop(temp);
        assert!(!path.exists());
    }

    #[test]
    fn overlay_kustomization_points_at_base_and_lists_patches() {
        let root = TempDir::new().unwrap();
        let base = root.path().join("app").join("base");
        let overlay = root.path().join("app").join("overlay");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&overlay).unwrap();
        fs::write(overlay.join("replicas.yaml"), "kind: Deployment\n").unwrap();
        fs::write(overlay.join(KUSTOMIZATION_FILE), "bases: []\n").unwrap();
        fs::write(overlay.join("notes.txt"), "ignored").unwrap();

        let temp = TempOverlayDir::create(Some(&root.path().join("tmp"))).unwrap();
        let written = write_overlay(temp.path(), &base, Some(&overlay)).unwrap();

        let k: Kustomization =
            serde_yaml::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(k.patches_strategic_merge, vec!["replicas.yaml".to_string()]);
        assert_eq!(k.bases.len(), 1);
        let resolved = fs::canonicalize(temp.path().join(&k.bases[0])).unwrap();
        assert_eq!(resolved, fs::canonicalize(&base).unwrap());
        assert!(temp.path().join("replicas.yaml").exists());
    }

    #[test]
    fn missing_overlay_dir_means_no_patches() {
        let root = TempDir::new().unwrap();
        let base = root.path().join("base");
        fs::create_dir_all(&base).unwrap();
        let temp = TempOverlayDir::create(Some(root.path())).unwrap();
        let written =
            write_overlay(temp.path(), &base, Some(&root.path().join("absent"))).unwrap();
        let k: Kustomization =
            serde_yaml::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert!(k.patches_strategic_merge.is_empty());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let tmp = TempDir::new().unwrap();
        let err = KustomizeCli::new(tmp.path().join("no-such-kustomize"))
            .build(tmp.path())
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }), "got: {err}");
    }
}
