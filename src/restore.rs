//! Restoration of missing files from the catalog
//!
//! One routine serves every restore flavour: callers pass a predicate over
//! catalog entries and [`restore_matching`] rewrites every matching entry
//! whose target path is absent on disk.
//!
//! ## Per-entry algorithm
//!
//! 1. Resolve the target: relative stored paths are joined to the archive
//!    root, then normalised.
//! 2. An existing target is left alone. Restoration never overwrites.
//! 3. Missing parent directories are created, and the restore mode is
//!    applied from the immediate parent upward through every ancestor inside
//!    the archive root (plus any directory this restore created outside it).
//!    Failing to set a mode is a warning only.
//! 4. The content is written with create-if-absent semantics, so a
//!    concurrent writer that got there first wins and this entry is reported
//!    as failed.
//! 5. The restore mode is applied to the new file.
//!
//! A failure on one entry never stops the others.

use crate::error::{NoobSaveError, Result};
use crate::types::{CatalogEntry, PassWarning, RestoreResult};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Target path of `entry` under `archive_root`
pub fn resolve_target(entry: &CatalogEntry, archive_root: &Path) -> PathBuf {
    if entry.path.is_relative() {
        utils::normalize_path(&utils::absolute_path(archive_root).join(&entry.path))
    } else {
        utils::normalize_path(&entry.path)
    }
}

/// Restore every entry accepted by `predicate` whose target is missing
///
/// ```rust,no_run
/// use noobsave::restore::restore_matching;
/// use noobsave::types::DEFAULT_RESTORE_MODE;
/// use std::path::Path;
///
/// # let entries: Vec<noobsave::CatalogEntry> = Vec::new();
/// let result = restore_matching(&entries, |_| true, Path::new("./archive"), DEFAULT_RESTORE_MODE);
/// println!("restored {} files", result.files_restored);
/// ```
pub fn restore_matching<P>(
    entries: &[CatalogEntry],
    predicate: P,
    archive_root: &Path,
    mode: u32,
) -> RestoreResult
where
    P: Fn(&CatalogEntry) -> bool,
{
    let start = Instant::now();
    let root = utils::absolute_path(archive_root);
    let mut result = RestoreResult::default();

    for entry in entries {
        if !predicate(entry) {
            continue;
        }
        let target = resolve_target(entry, &root);

        if fs::symlink_metadata(&target).is_ok() {
            trace!("{:?} already present, not restoring {}", target, entry.name);
            result.files_skipped_existing += 1;
            continue;
        }

        match restore_entry(entry, &target, &root, mode, &mut result.warnings) {
            Ok(bytes) => {
                result.files_restored += 1;
                result.bytes_written += bytes;
                debug!("Restored {} to {:?}", entry.name, target);
            }
            Err(e) => {
                warn!("Failed to restore {} to {:?}: {}", entry.name, target, e);
                result.files_failed += 1;
                result.warnings.push(PassWarning::new(&target, e));
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Restore finished in {}ms ({} restored, {} already present, {} failed)",
        result.duration_ms, result.files_restored, result.files_skipped_existing, result.files_failed
    );
    result
}

fn restore_entry(
    entry: &CatalogEntry,
    target: &Path,
    root: &Path,
    mode: u32,
    warnings: &mut Vec<PassWarning>,
) -> Result<u64> {
    let parent = target.parent().ok_or_else(|| {
        NoobSaveError::RestoreFailed(format!("{:?} has no parent directory", target))
    })?;

    let created = create_parent_chain(parent)?;
    propagate_permissions(parent, root, &created, mode, warnings);

    utils::write_new_file(target, &entry.content)?;

    if let Err(e) = utils::set_permissions(target, mode) {
        warn!("Could not set mode {:o} on {:?}: {}", mode, target, e);
        warnings.push(PassWarning::new(target, e));
    }

    Ok(entry.size())
}

/// Create `dir` and its missing ancestors, returning the ones created
fn create_parent_chain(dir: &Path) -> Result<Vec<PathBuf>> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect();

    if !missing.is_empty() {
        fs::create_dir_all(dir)?;
        trace!("Created {} director(ies) for {:?}", missing.len(), dir);
    }
    Ok(missing)
}

/// Apply `mode` from `start` upward while inside `root` or freshly created
fn propagate_permissions(
    start: &Path,
    root: &Path,
    created: &[PathBuf],
    mode: u32,
    warnings: &mut Vec<PassWarning>,
) {
    for dir in start.ancestors() {
        let inside_root = dir.starts_with(root);
        let created_here = created.iter().any(|c| c == dir);
        if !inside_root && !created_here {
            break;
        }
        if let Err(e) = utils::set_permissions(dir, mode) {
            warn!("Could not set mode {:o} on {:?}: {}", mode, dir, e);
            warnings.push(PassWarning::new(dir, e));
        }
        if dir == root {
            break;
        }
    }
}
