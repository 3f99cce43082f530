//! Core data types used throughout the NoobSave library
//!
//! ## Overview
//!
//! - **Catalog state**: [`CatalogEntry`] - one tracked file, content included
//! - **Settings**: [`SyncSettings`] - the singleton auto-save record
//! - **Configuration**: [`EngineConfig`] - engine-level knobs that are not user settings
//! - **Results**: [`ReconcileReport`], [`RestoreResult`], [`PassWarning`]
//!
//! ## Examples
//!
//! ```rust
//! use noobsave::types::SyncSettings;
//!
//! let settings = SyncSettings::default();
//! assert!(settings.auto_save_enabled);
//! assert_eq!(settings.auto_save_interval_ms, 60_000);
//! assert_eq!(settings.allowed_extensions, vec![".pdf", ".txt", ".docx"]);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// MIME type used when content classification finds nothing better
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Default auto-save interval in milliseconds
pub const DEFAULT_AUTO_SAVE_INTERVAL_MS: u64 = 60_000;

/// Extensions tracked when no settings record exists yet
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".txt", ".docx"];

/// Mode applied to restored files and their directory chain
pub const DEFAULT_RESTORE_MODE: u32 = 0o777;

/// A tracked file as recorded in the content catalog
///
/// The catalog is authoritative: the on-disk file is a mirror that can be
/// rebuilt from `content` at `path`.
///
/// `id` is `None` until the entry has been saved once; the store assigns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Store-assigned identifier
    pub id: Option<String>,
    /// Base name of the file, extension included
    pub name: String,
    /// Best-effort content classification
    pub mime_type: String,
    /// Location observed when the entry was first created
    pub path: PathBuf,
    /// Set once at first insertion
    pub added_at: DateTime<Utc>,
    /// Modification time of the source file at the last content change
    pub modified_at: DateTime<Utc>,
    /// Raw file bytes
    #[serde(with = "content_hex")]
    pub content: Vec<u8>,
}

impl CatalogEntry {
    /// Create an unsaved entry for a freshly discovered file
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        path: impl Into<PathBuf>,
        content: Vec<u8>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            mime_type: mime_type.into(),
            path: path.into(),
            added_at: Utc::now(),
            modified_at,
            content,
        }
    }

    /// Size of the stored content in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// SHA-256 of the stored content, hex encoded
    ///
    /// Only used for display. Change detection compares bytes.
    pub fn content_digest(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }

    /// Lookup key for name-based matching
    ///
    /// The raw file name of `path`, so names that are not valid UTF-8 still
    /// match exactly. Falls back to `name` for path-less entries.
    pub fn name_key(&self) -> &OsStr {
        self.path
            .file_name()
            .unwrap_or_else(|| OsStr::new(&self.name))
    }

    /// First 8 characters of the id, for logs and listings
    pub fn short_id(&self) -> &str {
        match &self.id {
            Some(id) => &id[..8.min(id.len())],
            None => "unsaved",
        }
    }

    /// Replace content and modification time together
    ///
    /// Returns `false` without touching the entry when the bytes are identical.
    pub fn apply_content(&mut self, content: Vec<u8>, modified_at: DateTime<Utc>) -> bool {
        if self.content == content {
            return false;
        }
        self.content = content;
        self.modified_at = modified_at;
        true
    }
}

/// Serde adapter keeping JSON exports of entries compact
mod content_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw).map_err(serde::de::Error::custom)
    }
}

/// The singleton auto-save settings record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Whether the scheduler runs reconciliation at all
    pub auto_save_enabled: bool,
    /// Minimum time between two scheduled passes
    pub auto_save_interval_ms: u64,
    /// Suffixes eligible for tracking, leading dot included
    pub allowed_extensions: Vec<String>,
    /// Overrides the engine's built-in save root when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_save_enabled: true,
            auto_save_interval_ms: DEFAULT_AUTO_SAVE_INTERVAL_MS,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            save_path: None,
        }
    }
}

impl SyncSettings {
    /// Save root to use given the engine's built-in default
    pub fn effective_save_path(&self, default: &Path) -> PathBuf {
        self.save_path
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }

    /// Interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.auto_save_interval_ms)
    }
}

/// Engine configuration that is not part of the user-editable settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Save root used when the settings carry no override
    pub default_save_path: PathBuf,
    /// Mode applied to restored files and their parent chain
    pub restore_permissions: u32,
    /// Period of the scheduler tick
    pub tick_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_save_path: PathBuf::from("archive"),
            restore_permissions: DEFAULT_RESTORE_MODE,
            tick_period: Duration::from_secs(5),
        }
    }
}

/// A non-fatal failure recorded during a pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassWarning {
    /// Path the failure relates to
    pub path: PathBuf,
    /// Human-readable failure
    pub message: String,
}

impl PassWarning {
    /// Create a warning for `path`
    pub fn new(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for PassWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Eligible files that were inserted, updated or found unchanged
    pub processed: usize,
    /// New catalog entries
    pub inserted: usize,
    /// Entries whose content changed
    pub updated: usize,
    /// Entries whose content was identical
    pub unchanged: usize,
    /// Eligible files skipped because they were empty or unreadable
    pub skipped: usize,
    /// Files rejected by the extension filter
    pub ignored: usize,
    /// Non-fatal failures encountered on the way
    pub warnings: Vec<PassWarning>,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    /// Number of catalog writes performed
    pub fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Result of a restore operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreResult {
    /// Files written back to disk
    pub files_restored: usize,
    /// Matching entries whose target already existed
    pub files_skipped_existing: usize,
    /// Matching entries that could not be written
    pub files_failed: usize,
    /// Total bytes written
    pub bytes_written: u64,
    /// Non-fatal failures, including permission propagation
    pub warnings: Vec<PassWarning>,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}
