// Durable local key-value storage backends

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::record::now_ms;

const CURRENT_VERSION: u32 = 1;
const STORE_DIR_NAME: &str = ".absensi";
const DB_FILE_NAME: &str = "absensi.db";

/// String-keyed storage where every write replaces the whole value
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Which backend holds the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    File,
}

/// Directory holding the store under a given root
pub fn store_dir<P: AsRef<Path>>(root: P) -> PathBuf {
    root.as_ref().join(STORE_DIR_NAME)
}

/// Create the store directory with its .gitignore and version marker
pub fn prepare_store_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create store directory")?;

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(
            gitignore_path,
            "absensi.db\nabsensi.db-shm\nabsensi.db-wal\n*.lock\n*.tmp\n",
        )?;
    }

    let version_path = dir.join(".version");
    if !version_path.exists() {
        fs::write(version_path, CURRENT_VERSION.to_string())?;
    }

    Ok(())
}

/// Open the configured backend inside `dir`
pub fn open_backend(dir: &Path, backend: Backend) -> Result<Box<dyn KeyValueStorage>> {
    prepare_store_dir(dir)?;
    let storage: Box<dyn KeyValueStorage> = match backend {
        Backend::Sqlite => Box::new(SqliteStorage::open(dir.join(DB_FILE_NAME))?),
        Backend::File => Box::new(FileStorage::open(dir)?),
    };
    Ok(storage)
}

/// Validate a storage key
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

/// Key-value table in a single SQLite database
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        debug!(path = ?path, "Opened SQLite storage");
        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating key-value schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        debug!(key, bytes = value.len(), "set_item: sqlite");
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// One `<key>.json` file per key, replaced whole on every write
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create storage directory")?;
        Ok(Self { dir })
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Some(value))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key)?;
        let lock_path = self.dir.join(format!("{}.lock", key));
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        debug!(key, bytes = value.len(), "set_item: file");

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        // Held until `lock` drops at the end of this call
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut file = fs::File::create(&tmp_path).context("Failed to create temporary file")?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path).context("Failed to replace stored value")?;

        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let path = self.value_path(key)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
