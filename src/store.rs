// Record store: ordered in-memory collection written through to key-value storage

use eyre::{Context, Result, eyre};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::record::{AbsenceRecord, Record, now_ms};
use crate::storage::{self, KeyValueStorage};

/// Store of absence records on whichever backend the config selects
pub type AbsenceStore = RecordStore<AbsenceRecord, Box<dyn KeyValueStorage>>;

/// Why `load` came back empty even though something was stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDiagnostic {
    /// The stored payload did not decode as a list of records
    Corrupt { key: String, error: String },
    /// The backend could not be read at all
    Unreadable { key: String, error: String },
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadDiagnostic::Corrupt { key, error } => {
                write!(f, "stored records under '{}' are corrupt: {}", key, error)
            }
            LoadDiagnostic::Unreadable { key, error } => {
                write!(f, "stored records under '{}' could not be read: {}", key, error)
            }
        }
    }
}

/// Newest-first collection of records persisted as one JSON array under one key
pub struct RecordStore<T: Record, S: KeyValueStorage> {
    storage: S,
    key: String,
    records: Vec<T>,
    revision: u64,
    diverged: bool,
    load_diagnostic: Option<LoadDiagnostic>,
}

impl<T: Record, S: KeyValueStorage> RecordStore<T, S> {
    /// Open the store and load the persisted collection once
    pub fn open(storage: S, key: &str) -> Result<Self> {
        storage::validate_key(key)?;

        let mut store = Self {
            storage,
            key: key.to_string(),
            records: Vec::new(),
            revision: 0,
            diverged: false,
            load_diagnostic: None,
        };

        let (records, diagnostic) = store.read_persisted();
        store.records = records;
        store.load_diagnostic = diagnostic;

        info!(key, count = store.records.len(), "Loaded records");
        Ok(store)
    }

    /// Read the whole persisted collection. Never fails: undecodable or unreadable
    /// data yields an empty collection, a logged warning and a fresh `load_diagnostic`.
    pub fn load(&mut self) -> Vec<T> {
        let (records, diagnostic) = self.read_persisted();
        self.load_diagnostic = diagnostic;
        records
    }

    /// Replace the whole collection and persist it
    pub fn save(&mut self, records: Vec<T>) -> Result<()> {
        self.records = records;
        self.revision += 1;
        self.persist()
    }

    /// Stamp a draft with a fresh id and timestamp, prepend it and persist
    ///
    /// On a storage failure the record stays in memory, the store is marked
    /// diverged and the error is returned.
    pub fn insert(&mut self, draft: T::Draft) -> Result<&[T]> {
        let timestamp = self.next_timestamp()?;
        let id = Uuid::now_v7().to_string();
        debug!(key = %self.key, id = %id, timestamp, "insert: called");

        self.records.insert(0, T::from_draft(draft, id, timestamp));
        self.revision += 1;
        self.persist()?;

        Ok(&self.records)
    }

    /// Remove the record with `id` and persist. Returns how many were removed (0 or 1).
    pub fn remove(&mut self, id: &str) -> Result<usize> {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        let removed = before - self.records.len();
        debug!(key = %self.key, id, removed, "remove: called");

        if removed > 0 {
            self.revision += 1;
        }
        self.persist()?;

        Ok(removed)
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped on every change to the in-memory collection
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when the last write failed and storage no longer mirrors memory
    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// What went wrong on the most recent read of storage, if anything
    pub fn load_diagnostic(&self) -> Option<&LoadDiagnostic> {
        self.load_diagnostic.as_ref()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_persisted(&self) -> (Vec<T>, Option<LoadDiagnostic>) {
        let payload = match self.storage.get_item(&self.key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return (Vec::new(), None),
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to read stored records, starting empty");
                let diagnostic = LoadDiagnostic::Unreadable {
                    key: self.key.clone(),
                    error: format!("{:#}", e),
                };
                return (Vec::new(), Some(diagnostic));
            }
        };

        match serde_json::from_str::<Vec<T>>(&payload) {
            Ok(records) => (records, None),
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to parse stored records, starting empty");
                let diagnostic = LoadDiagnostic::Corrupt {
                    key: self.key.clone(),
                    error: e.to_string(),
                };
                (Vec::new(), Some(diagnostic))
            }
        }
    }

    fn write_through(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.records).context("Failed to serialize records")?;
        self.storage
            .set_item(&self.key, &json)
            .with_context(|| format!("Failed to persist records under key {}", self.key))
    }

    fn persist(&mut self) -> Result<()> {
        match self.write_through() {
            Ok(()) => {
                if self.diverged {
                    info!(key = %self.key, "Persisted records back in sync with memory");
                }
                self.diverged = false;
                Ok(())
            }
            Err(e) => {
                self.diverged = true;
                error!(
                    key = %self.key,
                    in_memory = self.records.len(),
                    error = ?e,
                    "Persisted records diverged from memory"
                );
                Err(e)
            }
        }
    }

    // Strictly greater than every timestamp already held
    fn next_timestamp(&self) -> Result<i64> {
        let now = now_ms();
        match self.records.iter().map(|r| r.timestamp()).max() {
            Some(newest) if newest >= now => newest
                .checked_add(1)
                .ok_or_else(|| eyre!("No timestamp left after {} under key {}", newest, self.key)),
            _ => Ok(now),
        }
    }
}

/// Open the absence store under `root` using the configured backend and key
pub fn open_absence_store<P: AsRef<Path>>(root: P, config: &Config) -> Result<AbsenceStore> {
    let dir = storage::store_dir(root);
    let backend = storage::open_backend(&dir, config.backend)?;
    RecordStore::open(backend, &config.storage_key)
}
