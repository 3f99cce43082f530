//! Sub-tree classification of catalog entries
//!
//! Every entry's stored path is placed relative to the archive root. The
//! directory part of that relative path (joined with `/`) names the entry's
//! sub-directory; entries sitting directly in the root classify as
//! [`Subdirectory::Root`], entries outside the root as
//! [`Subdirectory::Unknown`]. Unknown entries never show up in listings and
//! never match a scoped restore.

use crate::types::CatalogEntry;
use crate::utils;
use std::collections::BTreeSet;
use std::path::{Component, Path};

/// Where an entry sits relative to the archive root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subdirectory {
    /// Directly inside the archive root
    Root,
    /// Inside a sub-directory, segments joined with `/`
    Named(String),
    /// Outside the archive root
    Unknown,
}

impl Subdirectory {
    /// Scope string used by restore filters: `""` for the root, `None` when unknown
    pub fn as_scope(&self) -> Option<&str> {
        match self {
            Subdirectory::Root => Some(""),
            Subdirectory::Named(name) => Some(name.as_str()),
            Subdirectory::Unknown => None,
        }
    }

    /// Whether this classification falls in the named scope
    ///
    /// An empty `scope` selects root-level entries only.
    pub fn matches_scope(&self, scope: &str) -> bool {
        self.as_scope() == Some(normalize_scope(scope).as_str())
    }
}

/// Canonical spelling of a user-supplied scope (`/docs/` -> `docs`)
pub fn normalize_scope(scope: &str) -> String {
    scope
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Classify a stored path against the archive root
///
/// Relative entry paths are taken relative to the archive root, the same
/// way the restorer resolves them.
///
/// ```rust
/// use noobsave::classify::{subdir_of, Subdirectory};
/// use std::path::Path;
///
/// let root = Path::new("/srv/archive");
/// assert_eq!(subdir_of(Path::new("/srv/archive/a.pdf"), root), Subdirectory::Root);
/// assert_eq!(
///     subdir_of(Path::new("/srv/archive/docs/2024/b.txt"), root),
///     Subdirectory::Named("docs/2024".to_string())
/// );
/// assert_eq!(subdir_of(Path::new("/elsewhere/c.txt"), root), Subdirectory::Unknown);
/// ```
pub fn subdir_of(entry_path: &Path, archive_root: &Path) -> Subdirectory {
    let root = utils::absolute_path(archive_root);
    let entry = if entry_path.is_absolute() {
        utils::normalize_path(entry_path)
    } else {
        utils::normalize_path(&root.join(entry_path))
    };

    let relative = match entry.strip_prefix(&root) {
        Ok(rel) => rel,
        Err(_) => return Subdirectory::Unknown,
    };

    let segments: Vec<String> = relative
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    // The root itself is not a file inside the root
    if relative.as_os_str().is_empty() {
        return Subdirectory::Unknown;
    }

    if segments.is_empty() {
        Subdirectory::Root
    } else {
        Subdirectory::Named(segments.join("/"))
    }
}

/// Sorted, de-duplicated sub-directories that hold at least one entry
///
/// Root-level and unknown entries contribute nothing.
pub fn known_subdirectories<'a, I>(entries: I, archive_root: &Path) -> Vec<String>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    entries
        .into_iter()
        .filter_map(|entry| match subdir_of(&entry.path, archive_root) {
            Subdirectory::Named(name) => Some(name),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
