//! Workflow state: persistence of [`ListRecord`]s.
//!
//! # Storage layout
//!
//! ```text
//! <state path>            (YAML, mode 0600)
//!   version: 1
//!   lists:
//!     - apiVersion: v1
//!       path: base/list.yaml
//!       items: [...]
//!   updated_at: 2026-01-01T00:00:00Z
//! ```
//!
//! The pipeline only ever emits records through [`StateManager`]; how and
//! where they are stored is up to the implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::types::ListRecord;

/// Current on-disk state version.
pub const STATE_VERSION: u32 = 1;

/// Sink for list expansion records.
pub trait StateManager {
    /// Persist one list expansion record.
    fn serialize_lists_metadata(&mut self, list: ListRecord) -> Result<(), StateError>;
}

/// On-disk state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub lists: Vec<ListRecord>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            lists: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileState
// ---------------------------------------------------------------------------

/// [`StateManager`] backed by a single YAML file.
#[derive(Debug, Clone)]
pub struct FileState {
    path: PathBuf,
}

impl FileState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state file; a missing file is an empty state.
    pub fn load(&self) -> Result<StateFile, StateError> {
        if !self.path.exists() {
            return Ok(StateFile::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| StateError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        serde_yaml::from_str(&contents).map_err(|e| StateError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }

    /// All recorded list expansions, oldest first.
    pub fn load_lists(&self) -> Result<Vec<ListRecord>, StateError> {
        Ok(self.load()?.lists)
    }

    /// Atomically save `state`.
    ///
    /// Write flow: serialize → `<path>.tmp` sibling → `chmod 0600` → `rename`.
    pub fn save(&self, state: &StateFile) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let yaml = serde_yaml::to_string(state)?;
        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        set_file_permissions(&tmp)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}

impl StateManager for FileState {
    fn serialize_lists_metadata(&mut self, list: ListRecord) -> Result<(), StateError> {
        let mut state = self.load()?;
        state.lists.push(list);
        state.updated_at = Utc::now();
        self.save(&state)
    }
}

// ---------------------------------------------------------------------------
// MemoryState
// ---------------------------------------------------------------------------

/// In-memory [`StateManager`]; collects records in emission order.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub lists: Vec<ListRecord>,
}

impl StateManager for MemoryState {
    fn serialize_lists_metadata(&mut self, list: ListRecord) -> Result<(), StateError> {
        self.lists.push(list);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn io_err(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
