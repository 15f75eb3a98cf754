/*
File: edep-aio/src/fs.rs
Purpose: Primitive synchronous filesystem operations.
*/
use std::{
    fs::{self, Permissions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use edep_common::error::{EdepError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Checks if a path points to a directory (resolving symlinks).
pub fn is_directory(path: &Path) -> bool {
    path.is_dir()
}

/// Checks if a path points to a regular file (resolving symlinks).
pub fn is_file(path: &Path) -> bool {
    path.is_file()
}

/// Creates a directory and all its parent components if they are missing.
pub fn create_dir_all(path: &Path) -> Result<()> {
    debug!("Creating directory recursively: {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        error!("Failed create dir {}: {}", path.display(), e);
        EdepError::IoError(format!("could not create directory {}: {e}", path.display()))
    })
}

/// Removes a file. A missing file is an error.
pub fn remove_file(path: &Path) -> Result<()> {
    debug!("Removing file: {}", path.display());
    fs::remove_file(path).map_err(|e| {
        if e.kind() != io::ErrorKind::NotFound {
            error!("Failed remove file {}: {}", path.display(), e);
        }
        EdepError::IoError(format!("could not remove {}: {e}", path.display()))
    })
}

/// Reads the entire contents of a file into a byte vector.
pub fn read_to_bytes(path: &Path) -> Result<Vec<u8>> {
    debug!("Reading file to bytes: {}", path.display());
    fs::read(path).map_err(|e| {
        error!("Failed read file {}: {}", path.display(), e);
        EdepError::IoError(format!("could not read {}: {e}", path.display()))
    })
}

/// Sets file permissions (Unix only). Mode is standard Unix octal mode.
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    debug!("Setting permissions on {}: {:o}", path.display(), mode);
    fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|e| {
        error!("Failed set permissions on {}: {}", path.display(), e);
        EdepError::from(e)
    })
}

#[cfg(not(unix))]
pub fn set_permissions(path: &Path, _mode: u32) -> Result<()> {
    warn!(
        "Setting permissions not fully supported on this platform: {}",
        path.display()
    );
    Ok(())
}

/// Atomically writes data to a file using a temporary file in the same
/// directory. Overwrites an existing file, keeping its permissions.
pub fn atomic_write_file(original_path: &Path, content: &[u8]) -> Result<()> {
    let dir = original_path.parent().ok_or_else(|| {
        EdepError::IoError(format!(
            "Cannot get parent directory for {}",
            original_path.display()
        ))
    })?;

    create_dir_all(dir)?;

    let original_perms = fs::metadata(original_path).map(|m| m.permissions()).ok();

    let mut temp_file = NamedTempFile::new_in(dir)?;
    let temp_path = temp_file.path().to_path_buf();

    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        original_path.display(),
        temp_path.display()
    );

    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(original_path).map_err(|e| {
        error!(
            "Failed to persist temporary file {} over {}: {}",
            temp_path.display(),
            original_path.display(),
            e.error
        );
        EdepError::Io(Arc::new(e.error))
    })?;

    if let Some(perms) = original_perms {
        if let Err(e) = fs::set_permissions(original_path, perms) {
            warn!(
                "Failed to restore original permissions on {}: {}",
                original_path.display(),
                e
            );
        }
    } else if cfg!(unix) {
        // New file: NamedTempFile creates 0600, the project files are shared.
        if let Err(e) = set_permissions(original_path, 0o644) {
            warn!(
                "Failed to set default permissions on new file {}: {}",
                original_path.display(),
                e
            );
        }
    }

    Ok(())
}

/// Lists directory entries, returning `(name, path, is_dir)`.
/// Skips entries that cause errors during reading.
pub fn list_directory_entries(dir_path: &Path) -> Result<Vec<(String, PathBuf, bool)>> {
    debug!("Listing directory entries for: {}", dir_path.display());
    let mut entries = Vec::new();
    let dir_path_str = dir_path.to_string_lossy().to_string();

    match fs::read_dir(dir_path) {
        Ok(read_dir) => {
            for entry_res in read_dir {
                match entry_res {
                    Ok(entry) => {
                        let path = entry.path();
                        let name = entry.file_name().to_string_lossy().to_string();
                        match entry.file_type() {
                            Ok(file_type) => {
                                entries.push((name, path, file_type.is_dir()));
                            }
                            Err(e) => {
                                warn!(
                                    "Failed to get file type for {} in {}: {}",
                                    path.display(),
                                    dir_path_str,
                                    e
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Error reading entry in {}: {}", dir_path_str, e);
                    }
                }
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(entries)
        }
        Err(e) => {
            error!("Failed to read directory {}: {}", dir_path.display(), e);
            Err(EdepError::IoError(format!(
                "unable to list {}: {e}",
                dir_path.display()
            )))
        }
    }
}
