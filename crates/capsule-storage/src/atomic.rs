//! Temp-file-then-rename writes with owner-only permissions.

use std::fs;
use std::io::Write;
use std::path::Path;

use capsule_core::errors::{StoreError, StoreResult};

/// Atomically replace `path` with `bytes`.
///
/// The bytes land in a sibling temp file, are synced, and the temp file is
/// renamed over the target. Readers see either the old or the new document.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".capsule-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StoreError::io(dir, e))?;
    temp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    temp.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    set_owner_only(temp.path())?;
    temp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = fs::File::open(dir) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Restrict `path` to owner read/write (0600). No-op off unix.
pub fn set_owner_only(path: &Path) -> StoreResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
