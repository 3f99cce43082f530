//! Directory walker and reconciler
//!
//! A reconciliation pass walks the save root depth-first and brings the
//! catalog in line with what is on disk:
//!
//! 1. A missing root is created (first-run bootstrap) and the pass ends with
//!    nothing processed.
//! 2. Every regular file passing the [`ExtensionFilter`] is read in full.
//!    Empty or unreadable files are skipped without failing the pass.
//! 3. The catalog is searched by file name. A hit whose bytes differ gets
//!    new content and modification time; identical bytes cause no write. A
//!    miss inserts a new entry recording the absolute walked path.
//!
//! A directory that cannot be listed is recorded as a warning and
//! contributes nothing; its siblings are still walked. Only a root that
//! cannot be created or listed fails the pass.
//!
//! ## Example
//!
//! ```rust,no_run
//! use noobsave::catalog::MemoryCatalog;
//! use noobsave::reconcile::Reconciler;
//! use std::path::Path;
//!
//! # fn main() -> noobsave::Result<()> {
//! let catalog = MemoryCatalog::new();
//! let reconciler = Reconciler::new(&catalog, &[".pdf", ".txt"]);
//! let report = reconciler.reconcile(Path::new("./archive"))?;
//! println!("{} files processed, {} warnings", report.processed, report.warnings.len());
//! # Ok(())
//! # }
//! ```

use crate::catalog::CatalogStore;
use crate::error::{NoobSaveError, Result};
use crate::filter::ExtensionFilter;
use crate::mime::detect_mime_type;
use crate::types::{CatalogEntry, PassWarning, ReconcileReport};
use crate::utils;
use chrono::{DateTime, Utc};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// What happened to one eligible file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// A new catalog entry was created
    Inserted,
    /// The existing entry received new content
    Updated,
    /// The existing entry already held these bytes
    Unchanged,
}

/// Walks a save root and reconciles it into a catalog
pub struct Reconciler<'a> {
    catalog: &'a dyn CatalogStore,
    filter: ExtensionFilter,
}

impl<'a> Reconciler<'a> {
    /// Reconciler writing to `catalog` and tracking `allowed_extensions`
    pub fn new<S: AsRef<str>>(catalog: &'a dyn CatalogStore, allowed_extensions: &[S]) -> Self {
        Self {
            catalog,
            filter: ExtensionFilter::new(allowed_extensions),
        }
    }

    /// Run one pass over `root`
    ///
    /// # Errors
    ///
    /// - [`NoobSaveError::SaveRootUnavailable`] if a missing root cannot be created
    /// - [`NoobSaveError::Io`] if the root exists but cannot be listed
    ///
    /// Everything below the root is best-effort and reported through
    /// [`ReconcileReport::warnings`].
    pub fn reconcile(&self, root: &Path) -> Result<ReconcileReport> {
        let start = Instant::now();
        let root = utils::absolute_path(root);
        let mut report = ReconcileReport::default();

        if !root.exists() {
            fs::create_dir_all(&root).map_err(|source| NoobSaveError::SaveRootUnavailable {
                path: root.clone(),
                source,
            })?;
            info!("Created save root {:?}", root);
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        // Fail fast when the root itself is unlistable
        fs::read_dir(&root)?;

        if self.filter.is_empty() {
            debug!("Extension allow-list is empty; no file is eligible");
        }

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for item in walker {
            match item {
                Ok(entry) => self.visit(&entry, &mut report),
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    warn!("Skipping unreadable part of the tree at {:?}: {}", path, e);
                    report.warnings.push(PassWarning::new(path, e));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Reconciled {:?} in {}ms ({} processed: {} new, {} updated, {} unchanged; {} skipped, {} warnings)",
            root,
            report.duration_ms,
            report.processed,
            report.inserted,
            report.updated,
            report.unchanged,
            report.skipped,
            report.warnings.len()
        );
        Ok(report)
    }

    fn visit(&self, entry: &DirEntry, report: &mut ReconcileReport) {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            trace!("Descending into {:?}", entry.path());
            return;
        }
        if !file_type.is_file() {
            trace!("Ignoring non-regular entry {:?}", entry.path());
            return;
        }

        let name = entry.file_name().to_string_lossy();
        if !self.filter.accepts(&name) {
            trace!("Ignoring {:?}: extension not allowed", entry.path());
            report.ignored += 1;
            return;
        }

        let content = match fs::read(entry.path()) {
            Ok(content) if content.is_empty() => {
                debug!("Skipping empty file {:?}", entry.path());
                report.skipped += 1;
                return;
            }
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {:?}: {}", entry.path(), e);
                report.skipped += 1;
                report.warnings.push(PassWarning::new(entry.path(), e));
                return;
            }
        };

        let modified_at = file_modified_at(entry);

        match self.reconcile_file(&name, entry.path(), content, modified_at) {
            Ok(outcome) => {
                report.processed += 1;
                match outcome {
                    FileOutcome::Inserted => report.inserted += 1,
                    FileOutcome::Updated => report.updated += 1,
                    FileOutcome::Unchanged => report.unchanged += 1,
                }
            }
            Err(e) => {
                warn!("Failed to record {:?} in the catalog: {}", entry.path(), e);
                report.skipped += 1;
                report.warnings.push(PassWarning::new(entry.path(), e));
            }
        }
    }

    /// Compare one file against its catalog entry and write if needed
    ///
    /// Entries are matched by the raw file name of `path` (`name` when the
    /// path has none); the stored `path` of an existing entry is never
    /// rewritten.
    pub fn reconcile_file(
        &self,
        name: &str,
        path: &Path,
        content: Vec<u8>,
        modified_at: DateTime<Utc>,
    ) -> Result<FileOutcome> {
        let key = path.file_name().unwrap_or_else(|| OsStr::new(name));
        match self.catalog.find_by_name(key)? {
            Some(mut existing) => {
                if existing.path != path {
                    trace!(
                        "{} matched entry recorded at {:?}, keeping that path",
                        name,
                        existing.path
                    );
                }
                if existing.apply_content(content, modified_at) {
                    self.catalog.save(existing)?;
                    debug!("Updated {} from {:?}", name, path);
                    Ok(FileOutcome::Updated)
                } else {
                    trace!("{} unchanged", name);
                    Ok(FileOutcome::Unchanged)
                }
            }
            None => {
                let mime_type = detect_mime_type(name, &content);
                let entry = CatalogEntry::new(name, mime_type, path, content, modified_at);
                let saved = self.catalog.save(entry)?;
                debug!("Inserted {} as {} ({})", name, saved.short_id(), saved.mime_type);
                Ok(FileOutcome::Inserted)
            }
        }
    }
}

fn file_modified_at(entry: &DirEntry) -> DateTime<Utc> {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .map(utils::system_time_to_utc)
        .unwrap_or_else(Utc::now)
}
