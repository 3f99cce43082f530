//! Auto-save settings provider
//!
//! Settings are a single logical record ([`SyncSettings`]). It is created
//! lazily with defaults on first read, mutated in place, and never deleted.
//!
//! Every mutation either succeeds completely or leaves the record untouched:
//! [`SettingsProvider::set_save_path`] validates before writing anything.

use crate::error::{NoobSaveError, Result};
use crate::types::SyncSettings;
use crate::utils;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of the auto-save settings record
pub trait SettingsProvider: Send + Sync {
    /// Current settings, creating the default record if absent
    fn get_settings(&self) -> Result<SyncSettings>;

    /// Turn the scheduled pass on or off
    fn set_auto_save_enabled(&self, enabled: bool) -> Result<()>;

    /// Minimum milliseconds between scheduled passes
    fn set_auto_save_interval(&self, interval_ms: u64) -> Result<()>;

    /// Replace the allow-list, keeping the given order
    fn set_allowed_extensions(&self, extensions: Vec<String>) -> Result<()>;

    /// Override the save root; the path must be an existing directory
    fn set_save_path(&self, path: &Path) -> Result<()>;

    /// Drop the override and fall back to the built-in save root
    fn clear_save_path(&self) -> Result<()>;
}

/// Reject empty paths and paths that are not existing directories
pub fn validate_save_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(NoobSaveError::invalid_save_path(path, "path is empty"));
    }
    if !path.exists() {
        return Err(NoobSaveError::invalid_save_path(path, "directory does not exist"));
    }
    if !path.is_dir() {
        return Err(NoobSaveError::invalid_save_path(path, "not a directory"));
    }
    Ok(())
}

/// Settings persisted as one JSON document
///
/// Writes go through a temp file and a rename, so a crash never leaves a
/// truncated record behind.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Use `path` as the settings document
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the settings document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_or_create(&self) -> Result<SyncSettings> {
        if self.path.exists() {
            let raw = std::fs::read(&self.path)?;
            return Ok(serde_json::from_slice(&raw)?);
        }

        let settings = SyncSettings::default();
        self.store(&settings)?;
        info!("Created default settings at {:?}", self.path);
        Ok(settings)
    }

    fn store(&self, settings: &SyncSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(settings)?;
        utils::atomic_write(&self.path, json.as_bytes())
    }

    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SyncSettings),
    {
        let _guard = self.lock.lock();
        let mut settings = self.load_or_create()?;
        mutate(&mut settings);
        self.store(&settings)?;
        debug!("Updated settings: {:?}", settings);
        Ok(())
    }
}

impl SettingsProvider for JsonSettingsStore {
    fn get_settings(&self) -> Result<SyncSettings> {
        let _guard = self.lock.lock();
        self.load_or_create()
    }

    fn set_auto_save_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|s| s.auto_save_enabled = enabled)
    }

    fn set_auto_save_interval(&self, interval_ms: u64) -> Result<()> {
        self.update(|s| s.auto_save_interval_ms = interval_ms)
    }

    fn set_allowed_extensions(&self, extensions: Vec<String>) -> Result<()> {
        self.update(|s| s.allowed_extensions = extensions)
    }

    fn set_save_path(&self, path: &Path) -> Result<()> {
        validate_save_path(path)?;
        let path = path.to_path_buf();
        self.update(|s| s.save_path = Some(path))
    }

    fn clear_save_path(&self) -> Result<()> {
        self.update(|s| s.save_path = None)
    }
}

/// Settings held in memory
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: RwLock<Option<SyncSettings>>,
}

impl MemorySettings {
    /// Start with no record; defaults appear on first read
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit record
    pub fn with_settings(settings: SyncSettings) -> Self {
        Self {
            inner: RwLock::new(Some(settings)),
        }
    }

    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SyncSettings),
    {
        let mut guard = self.inner.write();
        mutate(guard.get_or_insert_with(SyncSettings::default));
        Ok(())
    }
}

impl SettingsProvider for MemorySettings {
    fn get_settings(&self) -> Result<SyncSettings> {
        if let Some(settings) = self.inner.read().as_ref() {
            return Ok(settings.clone());
        }
        Ok(self
            .inner
            .write()
            .get_or_insert_with(SyncSettings::default)
            .clone())
    }

    fn set_auto_save_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|s| s.auto_save_enabled = enabled)
    }

    fn set_auto_save_interval(&self, interval_ms: u64) -> Result<()> {
        self.update(|s| s.auto_save_interval_ms = interval_ms)
    }

    fn set_allowed_extensions(&self, extensions: Vec<String>) -> Result<()> {
        self.update(|s| s.allowed_extensions = extensions)
    }

    fn set_save_path(&self, path: &Path) -> Result<()> {
        validate_save_path(path)?;
        let path = path.to_path_buf();
        self.update(|s| s.save_path = Some(path))
    }

    fn clear_save_path(&self) -> Result<()> {
        self.update(|s| s.save_path = None)
    }
}
