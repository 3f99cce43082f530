//! Content catalog storage
//!
//! The catalog maps a tracked file's name to its last-known bytes, MIME type,
//! path and timestamps. It is authoritative over disk state.
//!
//! ## Backends
//!
//! - [`SqliteCatalog`]: persistent, one `catalog_entries` table in a SQLite
//!   database file
//! - [`MemoryCatalog`]: process-local, used by tests and ephemeral engines
//!
//! Both implement [`CatalogStore`]. Each `save` is one atomic unit of work;
//! no transaction spans a whole reconciliation pass, so concurrent passes
//! resolve per record with last-write-wins.
//!
//! Lookups by name match the raw file name of the stored path
//! ([`CatalogEntry::name_key`]). The SQLite backend keeps that key and the
//! path as BLOBs of the OS bytes so names that are not valid UTF-8 survive a
//! round trip. The key is indexed but not unique: the reconciler avoids
//! duplicates by looking up before inserting.

use crate::error::{NoobSaveError, Result};
use crate::types::CatalogEntry;
use crate::utils::{os_str_to_bytes, os_string_from_bytes};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistence interface for catalog entries
pub trait CatalogStore: Send + Sync {
    /// First entry whose file name is exactly `name`, if any
    fn find_by_name(&self, name: &OsStr) -> Result<Option<CatalogEntry>>;

    /// Entry with this id, if any
    fn find_by_id(&self, id: &str) -> Result<Option<CatalogEntry>>;

    /// Every entry, in insertion order
    fn find_all(&self) -> Result<Vec<CatalogEntry>>;

    /// Insert (when `id` is `None`) or update the entry, returning it with its id
    fn save(&self, entry: CatalogEntry) -> Result<CatalogEntry>;

    /// Remove the entry; deleting an unknown entry is a no-op
    fn delete(&self, entry: &CatalogEntry) -> Result<()>;
}

fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// SQLite-backed catalog
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("location", &self.location)
            .finish()
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS catalog_entries (
        seq          INTEGER PRIMARY KEY AUTOINCREMENT,
        id           TEXT NOT NULL UNIQUE,
        name         TEXT NOT NULL,
        name_key     BLOB NOT NULL,
        mime_type    TEXT NOT NULL,
        path         BLOB NOT NULL,
        added_at     TEXT NOT NULL,
        modified_at  TEXT NOT NULL,
        content      BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_catalog_name_key ON catalog_entries(name_key);";

const SELECT_COLUMNS: &str = "id, name, mime_type, path, added_at, modified_at, content";

impl SqliteCatalog {
    /// Open or create a catalog database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Opened catalog at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
            location: Some(path.to_path_buf()),
        })
    }

    /// Create a catalog that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: None,
        })
    }

    /// Database file backing this catalog, if any
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn query_one<V: ToSql>(&self, column: &str, value: V) -> Result<Option<CatalogEntry>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM catalog_entries WHERE {column} = ?1 ORDER BY seq LIMIT 1"
        );
        let raw = conn
            .query_row(&sql, params![value], RawEntry::from_row)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }
}

/// Row as stored, before timestamp parsing
struct RawEntry {
    id: String,
    name: String,
    mime_type: String,
    path: Vec<u8>,
    added_at: String,
    modified_at: String,
    content: Vec<u8>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            mime_type: row.get(2)?,
            path: row.get(3)?,
            added_at: row.get(4)?,
            modified_at: row.get(5)?,
            content: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<CatalogEntry> {
        Ok(CatalogEntry {
            id: Some(self.id),
            name: self.name,
            mime_type: self.mime_type,
            path: PathBuf::from(os_string_from_bytes(self.path)),
            added_at: parse_timestamp(&self.added_at)?,
            modified_at: parse_timestamp(&self.modified_at)?,
            content: self.content,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NoobSaveError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

impl CatalogStore for SqliteCatalog {
    fn find_by_name(&self, name: &OsStr) -> Result<Option<CatalogEntry>> {
        self.query_one("name_key", os_str_to_bytes(name))
    }

    fn find_by_id(&self, id: &str) -> Result<Option<CatalogEntry>> {
        self.query_one("id", id)
    }

    fn find_all(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM catalog_entries ORDER BY seq"
        ))?;
        let rows = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }

    fn save(&self, mut entry: CatalogEntry) -> Result<CatalogEntry> {
        let conn = self.conn.lock();
        let id = entry.id.get_or_insert_with(new_entry_id).clone();
        let name_key = os_str_to_bytes(entry.name_key());
        let path = os_str_to_bytes(entry.path.as_os_str());

        // Upsert keeps the original seq so listing order stays insertion order
        conn.execute(
            "INSERT INTO catalog_entries (id, name, name_key, mime_type, path, added_at, modified_at, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_key = excluded.name_key,
                mime_type = excluded.mime_type,
                path = excluded.path,
                modified_at = excluded.modified_at,
                content = excluded.content",
            params![
                id,
                entry.name,
                name_key,
                entry.mime_type,
                path,
                format_timestamp(&entry.added_at),
                format_timestamp(&entry.modified_at),
                entry.content,
            ],
        )?;
        debug!("Saved catalog entry {} ({})", entry.short_id(), entry.name);
        Ok(entry)
    }

    fn delete(&self, entry: &CatalogEntry) -> Result<()> {
        let Some(id) = entry.id.as_deref() else {
            return Ok(());
        };
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM catalog_entries WHERE id = ?1", params![id])?;
        debug!("Deleted {} catalog row(s) for {}", removed, id);
        Ok(())
    }
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the catalog holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CatalogStore for MemoryCatalog {
    fn find_by_name(&self, name: &OsStr) -> Result<Option<CatalogEntry>> {
        Ok(self.entries.read().iter().find(|e| e.name_key() == name).cloned())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<CatalogEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .cloned())
    }

    fn find_all(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.read().clone())
    }

    fn save(&self, mut entry: CatalogEntry) -> Result<CatalogEntry> {
        let mut entries = self.entries.write();
        match entry.id.as_deref() {
            Some(id) => {
                if let Some(slot) = entries.iter_mut().find(|e| e.id.as_deref() == Some(id)) {
                    let added_at = slot.added_at;
                    *slot = entry.clone();
                    slot.added_at = added_at;
                    return Ok(slot.clone());
                }
            }
            None => entry.id = Some(new_entry_id()),
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    fn delete(&self, entry: &CatalogEntry) -> Result<()> {
        if let Some(id) = entry.id.as_deref() {
            self.entries.write().retain(|e| e.id.as_deref() != Some(id));
        }
        Ok(())
    }
}
