//! Manifest normalization: one document per file, no `kind: List` documents.
//!
//! Two passes share the same directory traversal:
//!
//! 1. [`maybe_split_multidoc_yaml`]: a file holding several `---`-separated
//!    documents becomes one file per document.
//! 2. [`maybe_split_list_yaml`]: a `kind: List` document becomes one file per
//!    item, and a [`ListRecord`] is emitted for it.
//!
//! Each directory is listed once, sorted by file name, before anything in it
//! is touched. On a non-YAML file the traversal follows the configured
//! [`NonYamlPolicy`]; the default stops processing the rest of that directory.
//!
//! Neither pass is transactional: on error, files already written stay written
//! and the source file may still exist.

use std::fs;
use std::path::{Path, PathBuf};

use kustprep_core::{
    generate_name_from_metadata, is_yaml_path, manifest::is_blank_document, ListK8sYaml,
    ListRecord, MinimalK8sYaml, NonYamlPolicy, StateManager,
};

use crate::error::{io_err, yaml_err, PipelineError};
use crate::fsutil::{sorted_entries, write_with_mode, NEW_FILE_MODE};

/// Files created and removed by a split pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Only filled by the list pass.
    pub lists: Vec<ListRecord>,
}

impl SplitOutcome {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn extend(&mut self, other: SplitOutcome) {
        self.written.extend(other.written);
        self.removed.extend(other.removed);
        self.lists.extend(other.lists);
    }
}

// ---------------------------------------------------------------------------
// Multi-document split
// ---------------------------------------------------------------------------

/// Split every multi-document YAML file under `base` into one file per document.
pub fn maybe_split_multidoc_yaml(
    base: &Path,
    policy: NonYamlPolicy,
) -> Result<SplitOutcome, PipelineError> {
    let mut outcome = SplitOutcome::default();
    visit_yaml_files(base, policy, &mut |path| {
        split_multidoc_file(path, &mut outcome)
    })?;
    Ok(outcome)
}

fn split_multidoc_file(path: &Path, outcome: &mut SplitOutcome) -> Result<(), PipelineError> {
    let bytes = fs::read(path).map_err(|e| io_err("read", path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let docs = split_documents(&text);
    if docs.len() < 2 {
        return Ok(());
    }

    tracing::debug!("splitting {} documents out of {}", docs.len(), path.display());
    let dir = parent_dir(path);
    for (idx, doc) in docs.iter().enumerate() {
        let identity = MinimalK8sYaml::from_slice(doc.as_bytes())
            .map_err(|e| yaml_err("unmarshal document from", path, e))?;
        let stem = generate_name_from_metadata(&identity, idx);
        outcome.written.push(write_split_file(dir, &stem, doc.as_bytes())?);
    }

    fs::remove_file(path).map_err(|e| io_err("remove multi doc yaml", path, e))?;
    outcome.removed.push(path.to_path_buf());
    Ok(())
}

/// Non-blank documents of a `---`-separated YAML stream, in order.
///
/// Content on the marker line itself (`--- {kind: A}`, `--- !!map`) opens
/// the next document.
pub fn split_documents(text: &str) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if let Some(inline) = document_marker(line) {
            docs.push(std::mem::take(&mut current));
            if !inline.is_empty() {
                current.push_str(inline);
                current.push('\n');
            }
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    docs.push(current);
    docs.retain(|d| !is_blank_document(d));
    docs
}

/// Text following a `---` document marker, or `None` if `line` is not one.
fn document_marker(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("---")?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

// ---------------------------------------------------------------------------
// List split
// ---------------------------------------------------------------------------

/// Expand every `kind: List` file under `base` into one file per item.
///
/// For each expanded list the original file is removed and a [`ListRecord`]
/// is handed to `state`; the records are also returned.
pub fn maybe_split_list_yaml(
    base: &Path,
    policy: NonYamlPolicy,
    state: &mut dyn StateManager,
) -> Result<SplitOutcome, PipelineError> {
    let mut outcome = SplitOutcome::default();
    visit_yaml_files(base, policy, &mut |path| {
        split_list_file(path, &mut *state, &mut outcome)
    })?;
    Ok(outcome)
}

fn split_list_file(
    path: &Path,
    state: &mut dyn StateManager,
    outcome: &mut SplitOutcome,
) -> Result<(), PipelineError> {
    let bytes = fs::read(path).map_err(|e| io_err("read", path, e))?;
    let top = MinimalK8sYaml::from_slice(&bytes).map_err(|e| yaml_err("unmarshal", path, e))?;
    if !top.is_list() {
        return Ok(());
    }
    let list: ListK8sYaml =
        serde_yaml::from_slice(&bytes).map_err(|e| yaml_err("unmarshal", path, e))?;

    tracing::debug!("expanding {} list items from {}", list.items.len(), path.display());
    let dir = parent_dir(path);
    let mut items = Vec::with_capacity(list.items.len());
    for (idx, item) in list.items.iter().enumerate() {
        let item_yaml = serde_yaml::to_string(item)
            .map_err(|e| yaml_err("marshal item from", path, e))?;
        let identity =
            MinimalK8sYaml::from_value(item).map_err(|e| yaml_err("unmarshal item from", path, e))?;

        let stem = generate_name_from_metadata(&identity, idx);
        outcome.written.push(write_split_file(dir, &stem, item_yaml.as_bytes())?);
        items.push(identity);
    }

    fs::remove_file(path).map_err(|e| io_err("remove k8s list", path, e))?;
    outcome.removed.push(path.to_path_buf());

    let record = ListRecord {
        api_version: list.api_version,
        path: path.to_path_buf(),
        items,
    };
    tracing::debug!("recording list metadata for {}", path.display());
    state.serialize_lists_metadata(record.clone())?;
    outcome.lists.push(record);
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared traversal
// ---------------------------------------------------------------------------

fn visit_yaml_files(
    dir: &Path,
    policy: NonYamlPolicy,
    f: &mut dyn FnMut(&Path) -> Result<(), PipelineError>,
) -> Result<(), PipelineError> {
    tracing::debug!("reading {}", dir.display());
    for entry in sorted_entries(dir)? {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| io_err("stat", &path, e))?;

        if file_type.is_dir() {
            visit_yaml_files(&path, policy, f)?;
            continue;
        }

        if !is_yaml_path(&path) {
            match policy {
                NonYamlPolicy::StopDirectory => {
                    tracing::debug!(
                        "non-yaml file {}; skipping the rest of {}",
                        path.display(),
                        dir.display()
                    );
                    return Ok(());
                }
                NonYamlPolicy::SkipFile => continue,
            }
        }

        f(&path)?;
    }
    Ok(())
}

/// Write a file produced by a split as `<stem>.yaml` in `dir` and return its path.
///
/// A name already holding different content is skipped by appending `-1`,
/// `-2`, ... to the stem. A name holding identical bytes is reused, so a
/// split that failed half-way can be re-run.
fn write_split_file(dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    let mut attempt = 0usize;
    loop {
        let target = match attempt {
            0 => dir.join(format!("{stem}.yaml")),
            n => dir.join(format!("{stem}-{n}.yaml")),
        };
        match fs::read(&target) {
            Ok(existing) if existing == bytes => return Ok(target),
            Ok(_) => {
                tracing::debug!("{} is taken, trying the next name", target.display());
                attempt += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_with_mode("write yaml", &target, bytes, NEW_FILE_MODE)?;
                return Ok(target);
            }
            Err(e) => return Err(io_err("read", &target, e)),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
