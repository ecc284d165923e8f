//! Reconciliation: rewrite a base's manifests with their built counterparts.
//!
//! ## `replace_original`
//!
//! 1. Scan: walk the base depth-first in file-name order and decide an action
//!    for every regular file. Nothing is modified yet.
//! 2. Check that no two files matched the same built resource.
//! 3. Apply the actions in walk order.
//!
//! A failure in step 3 leaves the files processed so far rewritten; there is
//! no rollback.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use kustprep_core::{generate_name_from_metadata, is_kustomization, MinimalK8sYaml};

use crate::base::should_add_file_to_base;
use crate::error::{io_err, walk_err, yaml_err, PipelineError};
use crate::fsutil::{mode_of, write_with_mode, NEW_FILE_MODE};
use crate::overlay::BuiltResources;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What reconciliation did with one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Contents replaced with the built resource; mode preserved.
    Replaced {
        path: PathBuf,
        identity: MinimalK8sYaml,
    },
    /// Built resource is byte-identical to the file; left alone.
    Unchanged { path: PathBuf },
    /// CustomResourceDefinitions are never rewritten.
    SkippedCrd { path: PathBuf },
    /// No built resource with this identity.
    NoMatch { path: PathBuf },
    /// Stale `kustomization.yaml`, removed.
    PrunedKustomization { path: PathBuf },
    /// Not a base resource (e.g. not YAML); untouched.
    Excluded { path: PathBuf },
}

impl ReplaceOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ReplaceOutcome::Replaced { path, .. }
            | ReplaceOutcome::Unchanged { path }
            | ReplaceOutcome::SkippedCrd { path }
            | ReplaceOutcome::NoMatch { path }
            | ReplaceOutcome::PrunedKustomization { path }
            | ReplaceOutcome::Excluded { path } => path,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced { .. })
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

enum Action {
    Prune,
    Exclude,
    SkipCrd,
    NoMatch,
    Replace {
        identity: MinimalK8sYaml,
        original: Vec<u8>,
        mode: u32,
    },
}

fn scan(base: &Path, built: &BuiltResources) -> Result<Vec<(PathBuf, Action)>, PipelineError> {
    let mut plan = Vec::new();
    let mut claimed: BTreeMap<MinimalK8sYaml, PathBuf> = BTreeMap::new();

    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_err(base, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_path_buf();

        if !should_add_file_to_base(&[], &path) {
            let action = if is_kustomization(&path) {
                Action::Prune
            } else {
                Action::Exclude
            };
            plan.push((path, action));
            continue;
        }

        let original = fs::read(&path).map_err(|e| io_err("read original", &path, e))?;
        let identity = MinimalK8sYaml::from_slice(&original)
            .map_err(|e| yaml_err("unmarshal original", &path, e))?;

        if identity.is_crd() {
            plan.push((path, Action::SkipCrd));
            continue;
        }
        if built.get(&identity).is_none() {
            plan.push((path, Action::NoMatch));
            continue;
        }

        if let Some(first) = claimed.get(&identity) {
            return Err(PipelineError::IdentityConflict {
                identity,
                first: first.display().to_string(),
                second: path.display().to_string(),
            });
        }
        claimed.insert(identity.clone(), path.clone());

        let meta = entry
            .metadata()
            .map_err(|e| walk_err(&path, e))?;
        plan.push((
            path,
            Action::Replace {
                identity,
                original,
                mode: mode_of(&meta),
            },
        ));
    }
    Ok(plan)
}

// ---------------------------------------------------------------------------
// replace_original
// ---------------------------------------------------------------------------

/// Rewrite every manifest under `base` that has a built counterpart.
///
/// `kustomization.yaml` files are removed, CRDs and files without a match are
/// left untouched, and rewritten files keep their permission bits.
pub fn replace_original(
    base: &Path,
    built: &BuiltResources,
) -> Result<Vec<ReplaceOutcome>, PipelineError> {
    let plan = scan(base, built)?;
    let mut outcomes = Vec::with_capacity(plan.len());

    for (path, action) in plan {
        let outcome = match action {
            Action::Prune => {
                fs::remove_file(&path).map_err(|e| io_err("remove kustomization yaml", &path, e))?;
                tracing::debug!("removed {}", path.display());
                ReplaceOutcome::PrunedKustomization { path }
            }
            Action::Exclude => ReplaceOutcome::Excluded { path },
            Action::SkipCrd => {
                tracing::debug!("skipping CRD {}", path.display());
                ReplaceOutcome::SkippedCrd { path }
            }
            Action::NoMatch => ReplaceOutcome::NoMatch { path },
            Action::Replace {
                identity,
                original,
                mode,
            } => replace_file(path, identity, &original, mode, built)?,
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn replace_file(
    path: PathBuf,
    identity: MinimalK8sYaml,
    original: &[u8],
    mode: u32,
    built: &BuiltResources,
) -> Result<ReplaceOutcome, PipelineError> {
    let Some(resource) = built.get(&identity) else {
        return Ok(ReplaceOutcome::NoMatch { path });
    };
    let rendered = serde_yaml::to_string(&resource.full)
        .map_err(|e| yaml_err("marshal init kustomized", &path, e))?;

    if rendered.as_bytes() == original {
        tracing::debug!("unchanged: {}", path.display());
        return Ok(ReplaceOutcome::Unchanged { path });
    }

    fs::remove_file(&path).map_err(|e| io_err("remove original file", &path, e))?;
    write_with_mode("write init kustomized file", &path, rendered.as_bytes(), mode)?;

    tracing::info!("replaced: {} ({identity})", path.display());
    Ok(ReplaceOutcome::Replaced { path, identity })
}

// ---------------------------------------------------------------------------
// Post-build output
// ---------------------------------------------------------------------------

/// Write every built resource to its own file under `dest`.
///
/// Files are named from identity and position in identity order.
pub fn write_post_kustomize_files(
    dest: &Path,
    built: &BuiltResources,
) -> Result<Vec<PathBuf>, PipelineError> {
    fs::create_dir_all(dest).map_err(|e| io_err("create dest dir", dest, e))?;
    let mut written = Vec::with_capacity(built.len());
    for (idx, resource) in built.iter().enumerate() {
        let target = dest.join(format!(
            "{}.yaml",
            generate_name_from_metadata(&resource.minimal, idx)
        ));
        let rendered = serde_yaml::to_string(&resource.full)
            .map_err(|e| yaml_err("marshal kustomized", &target, e))?;
        write_with_mode("write kustomized file", &target, rendered.as_bytes(), NEW_FILE_MODE)?;
        written.push(target);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
