//! Base resolution: follow a base's `kustomization.yaml` to its single upstream.

use std::path::{Path, PathBuf};

use kustprep_core::manifest::is_blank_document;
use kustprep_core::{Kustomization, KUSTOMIZATION_FILE};

use crate::error::{io_err, yaml_err, PipelineError};
use crate::paths;

/// Result of inspecting a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseResolution {
    /// The base the caller supplied.
    pub original: PathBuf,
    /// The upstream base named by `original`'s `kustomization.yaml`, if any.
    pub resolved: Option<PathBuf>,
}

impl BaseResolution {
    /// The base the rest of the pipeline operates on.
    pub fn active(&self) -> &Path {
        self.resolved.as_deref().unwrap_or(&self.original)
    }
}

/// Inspect the direct children of `base` for a `kustomization.yaml` naming an
/// upstream base.
///
/// No `kustomization.yaml`, or one with no `bases`, means no substitution.
/// More than one base is rejected with [`PipelineError::MultipleBases`].
/// Never mutates the filesystem.
pub fn contains_base(base: &Path) -> Result<BaseResolution, PipelineError> {
    tracing::debug!("looking for {KUSTOMIZATION_FILE} in {}", base.display());
    let entries = std::fs::read_dir(base).map_err(|e| io_err("read files in", base, e))?;

    let mut found = None;
    for entry in entries {
        let entry = entry.map_err(|e| io_err("read files in", base, e))?;
        if entry.file_name() == KUSTOMIZATION_FILE {
            found = Some(entry.path());
            break;
        }
    }

    let unresolved = BaseResolution {
        original: base.to_path_buf(),
        resolved: None,
    };
    let Some(kustomization_path) = found else {
        return Ok(unresolved);
    };

    let bytes = std::fs::read(&kustomization_path)
        .map_err(|e| io_err("read", &kustomization_path, e))?;
    let kustomization: Kustomization = if is_blank_document(&String::from_utf8_lossy(&bytes)) {
        Kustomization::default()
    } else {
        serde_yaml::from_slice(&bytes)
            .map_err(|e| yaml_err("parse file at", &kustomization_path, e))?
    };

    match kustomization.bases.as_slice() {
        [] => Ok(unresolved),
        [upstream] => {
            let resolved = paths::normalize(&base.join(upstream));
            tracing::debug!(
                "base {} points at upstream {}",
                base.display(),
                resolved.display()
            );
            Ok(BaseResolution {
                original: base.to_path_buf(),
                resolved: Some(resolved),
            })
        }
        many => Err(PipelineError::MultipleBases {
            path: kustomization_path,
            count: many.len(),
        }),
    }
}
