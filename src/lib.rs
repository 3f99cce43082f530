//! # NoobSave - catalog-backed auto-save and restore
//!
//! Keeps a database catalog of a watched directory tree in sync with the
//! files on disk, and rewrites files from the catalog when they go missing.
//!
//! ## Overview
//!
//! - A **reconciliation pass** walks the save root and stores the bytes of
//!   every file whose name ends in an allowed extension. Catalog entries are
//!   keyed by bare file name and only rewritten when the bytes change.
//! - A **scheduler gate** runs that pass periodically while auto-save is
//!   enabled and the configured interval has elapsed.
//! - A **restorer** recreates every cataloged file that is absent from disk,
//!   either for the whole tree or for one sub-directory. It never overwrites.
//!
//! Settings (auto-save flag, interval, allow-list, save root override) live
//! behind [`SettingsProvider`], catalog records behind [`CatalogStore`].
//! SQLite and JSON backed implementations are used by the `noobsave` binary,
//! in-memory ones are handy for embedding and tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use noobsave::SyncEngineBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SyncEngineBuilder::new()
//!     .data_dir(".noobsave")
//!     .default_save_path("./archive")
//!     .build()?;
//!
//! // Pick up whatever changed under ./archive
//! let report = engine.trigger_sync()?;
//! println!("{} new, {} updated", report.inserted, report.updated);
//!
//! // Bring back anything that was deleted
//! let restored = engine.restore_all_missing()?;
//! println!("Restored {} files", restored.files_restored);
//!
//! // Or just one sub-tree
//! for dir in engine.list_known_subdirectories()? {
//!     println!("known: {dir}");
//! }
//! engine.restore_subdirectory("docs")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scheduled saving
//!
//! ```rust,no_run
//! use noobsave::SyncEngineBuilder;
//! use std::time::Duration;
//!
//! # async fn run() -> noobsave::Result<()> {
//! let engine = SyncEngineBuilder::new().data_dir(".noobsave").build()?;
//! let handle = engine.scheduler().spawn(Duration::from_secs(5));
//!
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Public API modules
pub mod catalog;
pub mod classify;
pub mod engine;
pub mod error;
pub mod filter;
pub mod mime;
pub mod reconcile;
pub mod restore;
pub mod scheduler;
pub mod settings;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use catalog::{CatalogStore, MemoryCatalog, SqliteCatalog};
pub use classify::Subdirectory;
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use error::{NoobSaveError, Result};
pub use reconcile::Reconciler;
pub use scheduler::{SchedulerGate, SchedulerHandle, TickOutcome};
pub use settings::{JsonSettingsStore, MemorySettings, SettingsProvider};
pub use types::*;
