//! Integration tests for NoobSave
//!
//! Drives the engine through realistic directory trees with the SQLite
//! catalog and JSON settings, checking disk and catalog agree afterwards.

use ::noobsave::*;
use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::info;

/// Test harness keeping a model of what the save root should contain
pub struct NoobSaveTestHarness {
    pub root: TempDir,
    pub data: TempDir,
    pub engine: SyncEngine,
    pub expected: BTreeMap<PathBuf, Vec<u8>>,
}

impl NoobSaveTestHarness {
    /// Create a new test harness backed by on-disk stores
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let engine = SyncEngineBuilder::new()
            .data_dir(data.path())
            .default_save_path(root.path())
            .restore_permissions(0o755)
            .build()
            .unwrap();

        Self {
            root,
            data,
            engine,
            expected: BTreeMap::new(),
        }
    }

    /// Reopen the engine over the same data directory
    pub fn reopen(&mut self) {
        self.engine = SyncEngineBuilder::new()
            .data_dir(self.data.path())
            .default_save_path(self.root.path())
            .restore_permissions(0o755)
            .build()
            .unwrap();
    }

    /// Write a file relative to the save root and remember it
    pub fn write(&mut self, rel: &str, content: &[u8]) {
        let path = self.root.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        self.expected.insert(PathBuf::from(rel), content.to_vec());
    }

    /// Remove a file from disk without touching the model
    pub fn lose(&self, rel: &str) {
        fs::remove_file(self.root.path().join(rel)).unwrap();
    }

    /// Every remembered file exists with the remembered bytes
    pub fn verify_disk(&self) {
        for (rel, content) in &self.expected {
            let actual = fs::read(self.root.path().join(rel))
                .unwrap_or_else(|e| panic!("{} missing: {}", rel.display(), e));
            assert_eq!(&actual, content, "content mismatch for {}", rel.display());
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }
}

fn bump_mtime(path: &Path, secs_ahead: i64) {
    let meta = fs::metadata(path).unwrap();
    let current = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(
        path,
        FileTime::from_unix_time(current.unix_seconds() + secs_ahead, 0),
    )
    .unwrap();
}

#[test]
fn test_nested_tree_full_cycle() {
    let mut h = NoobSaveTestHarness::new();
    h.write("a.pdf", b"%PDF-1.4 a");
    h.write("docs/b.txt", b"b");
    h.write("docs/2024/q1/c.docx", b"PK c");
    h.write("media/d.txt", b"d");
    h.write("media/skip.mp4", b"not tracked");
    h.expected.remove(Path::new("media/skip.mp4"));

    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.inserted, 4);
    assert_eq!(report.ignored, 1);

    assert_eq!(
        h.engine.list_known_subdirectories().unwrap(),
        vec!["docs", "docs/2024/q1", "media"]
    );

    fs::remove_dir_all(h.path("docs")).unwrap();
    h.lose("a.pdf");

    let restored = h.engine.restore_all_missing().unwrap();
    info!("restored {} files", restored.files_restored);
    assert_eq!(restored.files_restored, 3);
    assert_eq!(restored.files_skipped_existing, 1);
    h.verify_disk();
}

#[test]
fn test_change_detection_keeps_added_at() {
    let mut h = NoobSaveTestHarness::new();
    h.write("notes.txt", b"v1");
    h.engine.trigger_sync().unwrap();
    let first = h.engine.get_entry_by_name("notes.txt").unwrap().unwrap();

    h.write("notes.txt", b"v2");
    bump_mtime(&h.path("notes.txt"), 3600);
    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.updated, 1);

    let second = h.engine.get_entry_by_name("notes.txt").unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.content, b"v2");
    assert_eq!(second.added_at, first.added_at);
    assert!(second.modified_at > first.modified_at);
}

#[test]
fn test_touch_without_change_is_not_a_write() {
    let mut h = NoobSaveTestHarness::new();
    h.write("same.txt", b"same");
    h.engine.trigger_sync().unwrap();
    let before = h.engine.get_entry_by_name("same.txt").unwrap().unwrap();

    bump_mtime(&h.path("same.txt"), 3600);
    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.writes(), 0);

    let after = h.engine.get_entry_by_name("same.txt").unwrap().unwrap();
    assert_eq!(after.modified_at, before.modified_at);
}

#[test]
fn test_same_name_in_two_directories_shares_one_entry() {
    let mut h = NoobSaveTestHarness::new();
    h.write("a/dup.txt", b"first");
    h.engine.trigger_sync().unwrap();
    h.write("b/dup.txt", b"second");
    h.engine.trigger_sync().unwrap();

    let entries = h.engine.list_all_entries().unwrap();
    assert_eq!(entries.len(), 1);
    // Path stays where the entry was first seen
    assert!(entries[0].path.ends_with("a/dup.txt"));
}

#[test]
fn test_allow_list_change_applies_to_next_pass() {
    let mut h = NoobSaveTestHarness::new();
    h.write("readme.md", b"# hi");
    h.write("doc.txt", b"doc");

    assert_eq!(h.engine.trigger_sync().unwrap().inserted, 1);

    h.engine
        .update_extensions(vec![".md".to_string()])
        .unwrap();
    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.ignored, 1);

    // Entries are never removed by narrowing the allow-list
    assert_eq!(h.engine.list_all_entries().unwrap().len(), 2);
}

#[test]
fn test_state_persists_across_reopen() {
    let mut h = NoobSaveTestHarness::new();
    h.write("keep/me.pdf", b"%PDF keep");
    h.engine.trigger_sync().unwrap();
    h.engine.update_auto_save(false).unwrap();

    h.reopen();
    assert!(!h.engine.settings().unwrap().auto_save_enabled);

    h.lose("keep/me.pdf");
    assert_eq!(h.engine.restore_subdirectory("keep").unwrap().files_restored, 1);
    h.verify_disk();
}

#[test]
fn test_delete_then_sync_recreates_entry() {
    let mut h = NoobSaveTestHarness::new();
    h.write("cycle.txt", b"cycle");
    h.engine.trigger_sync().unwrap();
    let entry = h.engine.get_entry_by_name("cycle.txt").unwrap().unwrap();

    h.engine.delete_entry(&entry).unwrap();
    assert!(!h.path("cycle.txt").exists());
    assert!(h.engine.list_all_entries().unwrap().is_empty());

    h.write("cycle.txt", b"cycle again");
    h.engine.trigger_sync().unwrap();
    let recreated = h.engine.get_entry_by_name("cycle.txt").unwrap().unwrap();
    assert_ne!(recreated.id, entry.id);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let mut h = NoobSaveTestHarness::new();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), b"outside").unwrap();
    std::os::unix::fs::symlink(outside.path(), h.path("link")).unwrap();
    std::os::unix::fs::symlink(outside.path().join("secret.txt"), h.path("alias.txt")).unwrap();
    h.write("real.txt", b"real");

    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.inserted, 1);
    assert!(h.engine.get_entry_by_name("secret.txt").unwrap().is_none());
    assert!(h.engine.get_entry_by_name("alias.txt").unwrap().is_none());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_survive_sync_and_restore() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut h = NoobSaveTestHarness::new();
    let latin1 = h.root.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
    let other = h.root.path().join("docs").join(OsStr::from_bytes(b"caf\xe8.txt"));
    fs::create_dir_all(h.path("docs")).unwrap();
    if fs::write(&latin1, b"first").is_err() {
        // Filesystem only accepts UTF-8 names
        return;
    }
    fs::write(&other, b"second").unwrap();

    let report = h.engine.trigger_sync().unwrap();
    assert_eq!(report.inserted, 2);

    h.reopen();
    let entries = h.engine.list_all_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.path == latin1));
    assert!(entries.iter().any(|e| e.path == other));

    fs::remove_file(&latin1).unwrap();
    fs::remove_dir_all(h.path("docs")).unwrap();
    let result = h.engine.restore_all_missing().unwrap();
    assert_eq!(result.files_restored, 2);
    assert_eq!(result.files_failed, 0);
    assert_eq!(fs::read(&latin1).unwrap(), b"first");
    assert_eq!(fs::read(&other).unwrap(), b"second");

    // Nothing was written under the lossy spelling
    assert!(!h.path("caf\u{FFFD}.txt").exists());

    let again = h.engine.trigger_sync().unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.unchanged, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_respects_toggle() {
    let mut h = NoobSaveTestHarness::new();
    h.write("tick.txt", b"tick");
    h.engine.update_auto_save(false).unwrap();

    let gate = h.engine.scheduler();
    let observer = gate.clone();
    let handle = gate.spawn(Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.engine.list_all_entries().unwrap().is_empty());
    assert!(observer.state().last_sync.is_none());

    h.engine.update_auto_save(true).unwrap();
    let mut saved = false;
    for _ in 0..100 {
        if !h.engine.list_all_entries().unwrap().is_empty() {
            saved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.shutdown().await;

    assert!(saved);
    assert!(observer.state().last_sync.is_some());
}
