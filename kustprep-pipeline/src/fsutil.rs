//! Small filesystem helpers shared by the splitters and the reconciler.

use std::fs;
use std::path::Path;

use crate::error::{io_err, PipelineError};

/// Mode given to files the pipeline creates from scratch.
pub const NEW_FILE_MODE: u32 = 0o644;

/// Write `bytes` to `path` and set its permission bits to exactly `mode`.
pub(crate) fn write_with_mode(
    op: &'static str,
    path: &Path,
    bytes: &[u8],
    mode: u32,
) -> Result<(), PipelineError> {
    fs::write(path, bytes).map_err(|e| io_err(op, path, e))?;
    set_mode(path, mode).map_err(|e| io_err(op, path, e))
}

/// Permission bits of `meta` (`0o644` on platforms without unix modes).
pub(crate) fn mode_of(meta: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        NEW_FILE_MODE
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}
#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Direct children of `dir`, sorted by file name.
///
/// The listing is a snapshot: callers may create and delete entries in `dir`
/// while iterating it.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, PipelineError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_err("read files in", dir, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err("read files in", dir, e))?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}
