//! Main test module for NoobSave
//!
//! This module includes all test suites:
//! - Integration tests for realistic trees and settings changes
//! - Chaos tests for unreadable input, races and broken state
//! - Property-based tests for filter, classifier and round-trip invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::noobsave::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine(root: &TempDir) -> SyncEngine {
        SyncEngineBuilder::new()
            .default_save_path(root.path())
            .restore_permissions(0o755)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_directory() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root);

        let report = engine.trigger_sync().unwrap();
        assert_eq!(report.processed, 0);
        assert!(engine.list_all_entries().unwrap().is_empty());
        assert!(engine.list_known_subdirectories().unwrap().is_empty());
        assert_eq!(engine.restore_all_missing().unwrap().files_restored, 0);
    }

    #[test]
    fn test_empty_files_are_skipped() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("empty.txt"), b"").unwrap();
        let engine = engine(&root);

        let report = engine.trigger_sync().unwrap();
        assert_eq!(report.skipped, 1);
        assert!(engine.get_entry_by_name("empty.txt").unwrap().is_none());
    }

    #[test]
    fn test_empty_allow_list_tracks_nothing() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.txt"), b"a").unwrap();
        let engine = engine(&root);
        engine.update_extensions(Vec::new()).unwrap();

        let report = engine.trigger_sync().unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("SCAN.PDF"), b"%PDF scan").unwrap();
        fs::write(root.path().join("Mixed.TxT"), b"mixed").unwrap();
        let engine = engine(&root);

        assert_eq!(engine.trigger_sync().unwrap().inserted, 2);
    }

    #[test]
    fn test_unicode_names() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("résumés")).unwrap();
        fs::write(root.path().join("résumés/日本語.txt"), "こんにちは").unwrap();
        let engine = engine(&root);
        engine.trigger_sync().unwrap();

        fs::remove_dir_all(root.path().join("résumés")).unwrap();
        assert_eq!(engine.list_known_subdirectories().unwrap(), vec!["résumés"]);
        assert_eq!(engine.restore_subdirectory("résumés").unwrap().files_restored, 1);
        assert_eq!(
            fs::read_to_string(root.path().join("résumés/日本語.txt")).unwrap(),
            "こんにちは"
        );
    }

    #[test]
    fn test_missing_save_root_is_created_on_sync() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not").join("yet");
        let engine = SyncEngineBuilder::new()
            .default_save_path(&root)
            .build()
            .unwrap();

        let report = engine.trigger_sync().unwrap();
        assert_eq!(report.processed, 0);
        assert!(root.is_dir());
    }

    #[test]
    fn test_entries_outside_root_are_never_scoped() {
        let root = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("far.txt"), b"far").unwrap();

        // Catalog the file while the override points elsewhere
        let engine = engine(&root);
        engine.update_save_path(elsewhere.path()).unwrap();
        engine.trigger_sync().unwrap();
        engine.clear_save_path().unwrap();

        assert!(engine.list_known_subdirectories().unwrap().is_empty());
        assert_eq!(engine.restore_subdirectory("").unwrap().files_restored, 0);
    }
}
