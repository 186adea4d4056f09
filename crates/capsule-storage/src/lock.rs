//! Companion lock file for registry writers.
//!
//! The lock itself is an `fd_lock::RwLock` over `<store>.lock`. Acquisition is
//! a bounded poll of `try_write`, done inline by the caller so the returned
//! guard stays tied to a local borrow.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use capsule_core::errors::{StoreError, StoreResult};

/// Path of the lock file guarding `store_path`.
pub fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

/// Open (creating if needed) the lock file and wrap it for locking.
pub fn open(lock_path: &Path) -> StoreResult<fd_lock::RwLock<File>> {
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)
        .map_err(|e| StoreError::io(lock_path, e))?;
    Ok(fd_lock::RwLock::new(file))
}

/// Whether a `try_write` failure means "held by someone else".
pub fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
}
