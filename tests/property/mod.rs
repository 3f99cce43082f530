//! Property-based testing for NoobSave
//!
//! Uses proptest to check the extension filter, the sub-tree classifier and
//! the sync/restore round trip over generated inputs.

use ::noobsave::classify::{known_subdirectories, subdir_of, Subdirectory};
use ::noobsave::filter::is_eligible;
use ::noobsave::*;
use chrono::Utc;
use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generate an extension with a leading dot
fn extension_strategy() -> impl Strategy<Value = String> {
    "\\.[a-z]{1,5}".prop_map(|s| s)
}

/// Generate a file stem without dots
fn stem_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,12}".prop_map(|s| s)
}

/// Generate directory segments (0-4 deep)
fn segments_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9]{0,7}", 0..=4)
}

/// Flip the case of every other character
fn scramble_case(s: &str) -> String {
    s.chars()
        .enumerate()
        .map(|(i, c)| {
            if i % 2 == 0 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

/// A generated tree: relative path -> content, names unique across the tree
fn tree_strategy() -> impl Strategy<Value = Vec<(PathBuf, Vec<u8>)>> {
    prop::collection::vec(
        (
            segments_strategy(),
            stem_strategy(),
            prop::sample::select(vec![".pdf", ".txt", ".docx"]),
            prop::collection::vec(any::<u8>(), 1..256),
        ),
        1..12,
    )
    .prop_map(|files| {
        files
            .into_iter()
            .enumerate()
            .map(|(i, (segments, stem, ext, content))| {
                let mut path: PathBuf = segments.iter().collect();
                // Index prefix keeps names unique, the catalog is keyed by name
                path.push(format!("{i}_{stem}{ext}"));
                (path, content)
            })
            .collect()
    })
}

fn write_tree(root: &Path, tree: &[(PathBuf, Vec<u8>)]) {
    for (rel, content) in tree {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Eligible iff some allowed suffix matches, ignoring case
    #[test]
    fn filter_matches_suffix_case_insensitively(
        stem in stem_strategy(),
        ext in extension_strategy(),
        allowed in prop::collection::vec(extension_strategy(), 0..5),
    ) {
        let name = format!("{stem}{ext}");
        let expected = allowed
            .iter()
            .any(|a| name.to_lowercase().ends_with(&a.to_lowercase()));
        prop_assert_eq!(is_eligible(&name, &allowed), expected);

        let mut with_ext = allowed.clone();
        with_ext.push(scramble_case(&ext));
        prop_assert!(is_eligible(&name, &with_ext));
        prop_assert!(is_eligible(&name.to_uppercase(), &with_ext));
    }

    /// The empty allow-list rejects everything
    #[test]
    fn filter_empty_list_rejects(name in ".{0,20}") {
        prop_assert!(!is_eligible::<&str>(&name, &[]));
    }

    /// Directory part of the relative path is the classification
    #[test]
    fn classifier_names_directory_part(
        segments in segments_strategy(),
        stem in stem_strategy(),
    ) {
        let root = Path::new("/srv/archive");
        let mut path = root.to_path_buf();
        for s in &segments {
            path.push(s);
        }
        path.push(format!("{stem}.txt"));

        let expected = if segments.is_empty() {
            Subdirectory::Root
        } else {
            Subdirectory::Named(segments.join("/"))
        };
        prop_assert_eq!(subdir_of(&path, root), expected.clone());

        // Relative spelling classifies the same way
        let relative: PathBuf = path.strip_prefix(root).unwrap().to_path_buf();
        prop_assert_eq!(subdir_of(&relative, root), expected);
    }

    /// Listing is sorted, unique and never contains the root marker
    #[test]
    fn known_subdirectories_sorted_unique(
        dirs in prop::collection::vec(segments_strategy(), 0..20),
    ) {
        let root = Path::new("/srv/archive");
        let entries: Vec<CatalogEntry> = dirs
            .iter()
            .enumerate()
            .map(|(i, segs)| {
                let mut path = root.to_path_buf();
                for s in segs {
                    path.push(s);
                }
                path.push(format!("f{i}.txt"));
                CatalogEntry::new(format!("f{i}.txt"), "text/plain", path, vec![1], Utc::now())
            })
            .collect();

        let listed = known_subdirectories(&entries, root);
        let mut sorted = listed.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&listed, &sorted);
        prop_assert!(listed.iter().all(|d| !d.is_empty()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A second pass over an unchanged tree writes nothing
    #[test]
    fn reconcile_is_idempotent(tree in tree_strategy()) {
        let root = TempDir::new().unwrap();
        write_tree(root.path(), &tree);
        let engine = SyncEngineBuilder::new()
            .default_save_path(root.path())
            .build()
            .unwrap();

        let first = engine.trigger_sync().unwrap();
        prop_assert_eq!(first.inserted, tree.len());
        let snapshot = engine.list_all_entries().unwrap();

        let second = engine.trigger_sync().unwrap();
        prop_assert_eq!(second.writes(), 0);
        prop_assert_eq!(engine.list_all_entries().unwrap(), snapshot);
    }

    /// Deleting everything and restoring gives back identical bytes
    #[test]
    fn sync_delete_restore_round_trip(tree in tree_strategy()) {
        let root = TempDir::new().unwrap();
        write_tree(root.path(), &tree);
        let engine = SyncEngineBuilder::new()
            .default_save_path(root.path())
            .restore_permissions(0o755)
            .build()
            .unwrap();
        engine.trigger_sync().unwrap();

        for (rel, _) in &tree {
            fs::remove_file(root.path().join(rel)).unwrap();
        }

        let result = engine.restore_all_missing().unwrap();
        prop_assert_eq!(result.files_restored, tree.len());
        for (rel, content) in &tree {
            prop_assert_eq!(&fs::read(root.path().join(rel)).unwrap(), content);
        }
    }
}
