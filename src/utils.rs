//! Utility functions for NoobSave
//!
//! Helpers shared by the reconciler, the restorer and the settings store:
//!
//! ### File Operations
//! - Permission handling (cross-platform)
//! - Atomic file writing
//! - Create-if-absent writes
//!
//! ### Path Manipulation
//! - Lexical normalisation (`.` and `..` folded without touching the disk)
//! - Absolute path resolution against the working directory
//! - Lossless conversion of OS strings to and from raw bytes
//!
//! ### Data Processing
//! - Byte formatting (human-readable sizes)
//! - `SystemTime` to `chrono` conversion
//!
//! All functions are thread-safe and can be called concurrently.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::trace;

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
///
/// Only the owner-write bit is meaningful: it maps to the read-only flag.
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    let is_readonly = (mode & 0o200) == 0;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(is_readonly);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Get the permission bits of a path
#[cfg(unix)]
pub fn get_permissions(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o7777)
}

/// Get the permission bits of a path (Windows implementation)
#[cfg(windows)]
pub fn get_permissions(path: &Path) -> Result<u32> {
    let metadata = fs::metadata(path)?;
    let mut mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    Ok(mode)
}

/// Atomic file write (write to temp file then rename)
///
/// The target is never observed half-written: either the previous content
/// or the complete new content is visible.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Write `content` to `path` only if nothing exists there yet
///
/// Fails with [`std::io::ErrorKind::AlreadyExists`] when another writer got
/// there first. Partially written files are removed on failure.
pub fn write_new_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(content).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    trace!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Resolve `path` against the current directory if it is relative, then
/// normalise it lexically
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_path(&joined)
}

/// Fold `.` and `..` components without touching the filesystem
///
/// Symlinks are not resolved. A `..` that would climb above the root is
/// dropped, matching how the OS resolves `/..`.
///
/// ```rust
/// use noobsave::utils::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
/// assert_eq!(normalize_path(Path::new("docs/../x.txt")), PathBuf::from("x.txt"));
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.as_os_str().is_empty()
                    || matches!(out.components().next_back(), Some(Component::RootDir | Component::Prefix(_)));
                if at_root {
                    if !path.has_root() {
                        out.push("..");
                    }
                } else if matches!(out.components().next_back(), Some(Component::ParentDir)) {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Raw bytes of an OS string
///
/// Exact on Unix, where file names are arbitrary byte strings. Elsewhere the
/// UTF-8 form is used.
#[cfg(unix)]
pub fn os_str_to_bytes(s: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().to_vec()
}

/// Raw bytes of an OS string (non-Unix implementation)
#[cfg(not(unix))]
pub fn os_str_to_bytes(s: &OsStr) -> Vec<u8> {
    s.to_string_lossy().into_owned().into_bytes()
}

/// Inverse of [`os_str_to_bytes`]
#[cfg(unix)]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

/// Inverse of [`os_str_to_bytes`] (non-Unix implementation)
#[cfg(not(unix))]
pub fn os_string_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Convert a filesystem timestamp into UTC
pub fn system_time_to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
