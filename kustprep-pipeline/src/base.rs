//! Synthetic base configuration.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use kustprep_core::{is_kustomization, is_yaml_path, Kustomization, KUSTOMIZATION_FILE};

use crate::error::{walk_err, yaml_err, PipelineError};
use crate::fsutil::{write_with_mode, NEW_FILE_MODE};
use crate::overlay::slash_path;

/// Whether `path` belongs in a base's `resources`.
///
/// Rejects non-YAML paths, anything under an `excluded` prefix, and
/// `kustomization.yaml` itself.
pub fn should_add_file_to_base(excluded: &[PathBuf], path: &Path) -> bool {
    if !is_yaml_path(path) {
        return false;
    }
    if excluded.iter().any(|prefix| path.starts_with(prefix)) {
        return false;
    }
    !is_kustomization(path)
}

/// Write `<base>/kustomization.yaml` listing every resource file under `base`.
///
/// Replaces any existing `kustomization.yaml` in `base`. A base with no
/// resource files is an [`PipelineError::EmptyBase`].
pub fn write_base(base: &Path) -> Result<PathBuf, PipelineError> {
    let mut kustomization = Kustomization::default();

    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_err(base, e))?;
        if !entry.file_type().is_file() || !should_add_file_to_base(&[], entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        kustomization.resources.push(slash_path(relative));
    }

    if kustomization.resources.is_empty() {
        return Err(PipelineError::EmptyBase {
            path: base.to_path_buf(),
        });
    }

    let target = base.join(KUSTOMIZATION_FILE);
    let yaml = serde_yaml::to_string(&kustomization)
        .map_err(|e| yaml_err("marshal base kustomization", &target, e))?;
    write_with_mode("write base kustomization", &target, yaml.as_bytes(), NEW_FILE_MODE)?;
    tracing::debug!(
        "wrote {} with {} resources",
        target.display(),
        kustomization.resources.len()
    );
    Ok(target)
}
