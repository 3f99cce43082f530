//! Public façade tying settings, catalog and configuration together
//!
//! [`SyncEngine`] is cheap to clone: every clone shares the same catalog and
//! settings provider. All operations are synchronous; only the scheduler
//! returned by [`SyncEngine::scheduler`] needs a tokio runtime.

use crate::catalog::{CatalogStore, MemoryCatalog, SqliteCatalog};
use crate::classify;
use crate::error::{NoobSaveError, Result};
use crate::reconcile::Reconciler;
use crate::restore;
use crate::scheduler::SchedulerGate;
use crate::settings::{JsonSettingsStore, MemorySettings, SettingsProvider};
use crate::types::{CatalogEntry, EngineConfig, ReconcileReport, RestoreResult, SyncSettings};
use crate::utils;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// File name of the catalog database inside a data directory
pub const CATALOG_FILE: &str = "catalog.db";

/// File name of the settings document inside a data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Synchronisation and restoration engine
///
/// # Examples
///
/// ```rust,no_run
/// use noobsave::SyncEngineBuilder;
///
/// # fn main() -> noobsave::Result<()> {
/// let engine = SyncEngineBuilder::new()
///     .data_dir(".noobsave")
///     .default_save_path("./archive")
///     .build()?;
///
/// let report = engine.trigger_sync()?;
/// println!("{} files processed", report.processed);
///
/// let restored = engine.restore_all_missing()?;
/// println!("{} files restored", restored.files_restored);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncEngine {
    catalog: Arc<dyn CatalogStore>,
    settings: Arc<dyn SettingsProvider>,
    config: EngineConfig,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Assemble an engine from explicit parts
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        settings: Arc<dyn SettingsProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            settings,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying catalog store
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    /// Underlying settings provider
    pub fn settings_provider(&self) -> &dyn SettingsProvider {
        self.settings.as_ref()
    }

    /// Current settings record
    pub fn settings(&self) -> Result<SyncSettings> {
        self.settings.get_settings()
    }

    /// Save root in effect: the settings override or the built-in default
    pub fn effective_save_path(&self) -> Result<PathBuf> {
        Ok(self
            .settings()?
            .effective_save_path(&self.config.default_save_path))
    }

    /// Reconcile the save root against the catalog now
    ///
    /// Runs regardless of the auto-save flag and does not affect the
    /// scheduler's bookkeeping.
    ///
    /// # Errors
    ///
    /// Fails when the save root cannot be created or listed, or when the
    /// settings cannot be read. Per-file problems are reported as warnings
    /// in the returned report.
    #[instrument(skip(self))]
    pub fn trigger_sync(&self) -> Result<ReconcileReport> {
        let settings = self.settings()?;
        let root = settings.effective_save_path(&self.config.default_save_path);
        Reconciler::new(self.catalog.as_ref(), &settings.allowed_extensions).reconcile(&root)
    }

    /// Every catalog entry
    pub fn list_all_entries(&self) -> Result<Vec<CatalogEntry>> {
        self.catalog.find_all()
    }

    /// Entry by id; `None` when unknown
    pub fn get_entry(&self, id: &str) -> Result<Option<CatalogEntry>> {
        self.catalog.find_by_id(id)
    }

    /// Entry by full id or by an id prefix that matches exactly one entry
    pub fn resolve_entry(&self, id_or_prefix: &str) -> Result<CatalogEntry> {
        if let Some(entry) = self.get_entry(id_or_prefix)? {
            return Ok(entry);
        }

        let mut matches: Vec<CatalogEntry> = self
            .catalog
            .find_all()?
            .into_iter()
            .filter(|e| e.id.as_deref().is_some_and(|id| id.starts_with(id_or_prefix)))
            .collect();

        match matches.len() {
            0 => Err(NoobSaveError::EntryNotFound(id_or_prefix.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(NoobSaveError::AmbiguousId {
                prefix: id_or_prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Entry by bare file name; `None` when unknown
    pub fn get_entry_by_name(&self, name: &str) -> Result<Option<CatalogEntry>> {
        self.catalog.find_by_name(OsStr::new(name))
    }

    /// Remove an entry's file from disk and its record from the catalog
    ///
    /// The disk removal is best-effort: a missing file is fine and any other
    /// failure is only logged. The catalog delete is authoritative.
    #[instrument(skip(self, entry), fields(name = %entry.name))]
    pub fn delete_entry(&self, entry: &CatalogEntry) -> Result<()> {
        let root = self.effective_save_path()?;
        let target = restore::resolve_target(entry, &root);

        match fs::remove_file(&target) {
            Ok(()) => debug!("Removed {:?}", target),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{:?} already gone from disk", target)
            }
            Err(e) => warn!("Failed to remove {:?}: {}", target, e),
        }

        self.catalog.delete(entry)?;
        info!("Deleted catalog entry {} ({})", entry.short_id(), entry.name);
        Ok(())
    }

    /// Look up `id` and delete it
    ///
    /// # Errors
    ///
    /// [`NoobSaveError::EntryNotFound`] when no entry has that id.
    pub fn delete_entry_by_id(&self, id: &str) -> Result<CatalogEntry> {
        let entry = self
            .get_entry(id)?
            .ok_or_else(|| NoobSaveError::EntryNotFound(id.to_string()))?;
        self.delete_entry(&entry)?;
        Ok(entry)
    }

    /// Rewrite every catalog entry whose file is missing
    #[instrument(skip(self))]
    pub fn restore_all_missing(&self) -> Result<RestoreResult> {
        let root = self.effective_save_path()?;
        let entries = self.catalog.find_all()?;
        Ok(restore::restore_matching(
            &entries,
            |_| true,
            &root,
            self.config.restore_permissions,
        ))
    }

    /// Sorted sub-directories of the save root that hold catalog entries
    pub fn list_known_subdirectories(&self) -> Result<Vec<String>> {
        let root = self.effective_save_path()?;
        let entries = self.catalog.find_all()?;
        Ok(classify::known_subdirectories(&entries, &root))
    }

    /// Restore missing entries classified under `name`
    ///
    /// An empty `name` restores root-level entries only.
    #[instrument(skip(self))]
    pub fn restore_subdirectory(&self, name: &str) -> Result<RestoreResult> {
        let root = self.effective_save_path()?;
        let entries = self.catalog.find_all()?;
        Ok(restore::restore_matching(
            &entries,
            |entry| classify::subdir_of(&entry.path, &root).matches_scope(name),
            &root,
            self.config.restore_permissions,
        ))
    }

    /// Write an entry's content to `dest`, never overwriting
    ///
    /// When `dest` is an existing directory the entry's name is appended.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// [`NoobSaveError::EntryNotFound`] for an unknown id, or an I/O error if
    /// the destination already exists or cannot be written.
    #[instrument(skip(self))]
    pub fn export_entry(&self, id: &str, dest: &Path) -> Result<PathBuf> {
        let entry = self
            .get_entry(id)?
            .ok_or_else(|| NoobSaveError::EntryNotFound(id.to_string()))?;

        let target = if dest.is_dir() {
            dest.join(entry.name_key())
        } else {
            dest.to_path_buf()
        };

        utils::write_new_file(&target, &entry.content)?;
        info!(
            "Exported {} ({}) to {:?}",
            entry.name,
            utils::format_bytes(entry.size()),
            target
        );
        Ok(target)
    }

    /// Turn scheduled saving on or off
    pub fn update_auto_save(&self, enabled: bool) -> Result<()> {
        self.settings.set_auto_save_enabled(enabled)
    }

    /// Minimum time between scheduled passes
    pub fn update_interval(&self, interval: Duration) -> Result<()> {
        let millis = u64::try_from(interval.as_millis()).map_err(|_| {
            NoobSaveError::invalid_configuration(format!("interval {:?} is too large", interval))
        })?;
        self.settings.set_auto_save_interval(millis)
    }

    /// Replace the extension allow-list
    pub fn update_extensions(&self, extensions: Vec<String>) -> Result<()> {
        self.settings.set_allowed_extensions(extensions)
    }

    /// Override the save root
    ///
    /// # Errors
    ///
    /// [`NoobSaveError::InvalidSavePath`] when `path` is empty or not an
    /// existing directory; the settings are left unchanged.
    pub fn update_save_path(&self, path: &Path) -> Result<()> {
        self.settings.set_save_path(path)
    }

    /// Go back to the built-in save root
    pub fn clear_save_path(&self) -> Result<()> {
        self.settings.clear_save_path()
    }

    /// Scheduler gate running passes through this engine
    pub fn scheduler(&self) -> SchedulerGate {
        SchedulerGate::new(self.clone())
    }
}

/// Builder for [`SyncEngine`]
///
/// Without a data directory or explicit stores the engine keeps everything
/// in memory.
///
/// # Examples
///
/// ```rust
/// use noobsave::SyncEngineBuilder;
/// use std::time::Duration;
///
/// let engine = SyncEngineBuilder::new()
///     .default_save_path("/tmp/archive")
///     .restore_permissions(0o755)
///     .tick_period(Duration::from_secs(1))
///     .build()
///     .unwrap();
/// assert_eq!(engine.config().restore_permissions, 0o755);
/// ```
#[derive(Default)]
pub struct SyncEngineBuilder {
    config: EngineConfig,
    data_dir: Option<PathBuf>,
    catalog: Option<Arc<dyn CatalogStore>>,
    settings: Option<Arc<dyn SettingsProvider>>,
}

impl SyncEngineBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Save root used when the settings carry no override
    pub fn default_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.default_save_path = path.into();
        self
    }

    /// Mode applied to restored files and their directories
    pub fn restore_permissions(mut self, mode: u32) -> Self {
        self.config.restore_permissions = mode;
        self
    }

    /// Scheduler tick period
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// Keep the catalog database and settings document in `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Use an explicit catalog store
    pub fn catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Use an explicit settings provider
    pub fn settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Fails if the data directory or the catalog database cannot be opened.
    pub fn build(self) -> Result<SyncEngine> {
        if self.config.restore_permissions > 0o7777 {
            return Err(NoobSaveError::invalid_configuration(format!(
                "restore permissions {:o} are not a valid mode",
                self.config.restore_permissions
            )));
        }

        if let Some(dir) = &self.data_dir {
            fs::create_dir_all(dir)?;
        }

        let catalog: Arc<dyn CatalogStore> = match (self.catalog, &self.data_dir) {
            (Some(catalog), _) => catalog,
            (None, Some(dir)) => Arc::new(SqliteCatalog::open(&dir.join(CATALOG_FILE))?),
            (None, None) => Arc::new(MemoryCatalog::new()),
        };

        let settings: Arc<dyn SettingsProvider> = match (self.settings, &self.data_dir) {
            (Some(settings), _) => settings,
            (None, Some(dir)) => Arc::new(JsonSettingsStore::new(dir.join(SETTINGS_FILE))),
            (None, None) => Arc::new(MemorySettings::new()),
        };

        debug!("Engine configured: {:?}", self.config);
        Ok(SyncEngine::new(catalog, settings, self.config))
    }
}
