//! Consent persistence over a string key/value backend.
//!
//! The key space matches what the website keeps in `localStorage`:
//! `consent-essential`, `consent-analytics`, `consent-advertising` and
//! `consent-date`. Reads fail safe: anything missing or unparseable is
//! treated as "no consent", and a missing date means no record at all.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use mowforce_core::{Error, Result};

use crate::types::ConsentRecord;

pub const KEY_ESSENTIAL: &str = "consent-essential";
pub const KEY_ANALYTICS: &str = "consent-analytics";
pub const KEY_ADVERTISING: &str = "consent-advertising";
pub const KEY_DATE: &str = "consent-date";

/// All keys owned by the consent store.
pub const CONSENT_KEYS: [&str; 4] = [KEY_ESSENTIAL, KEY_ANALYTICS, KEY_ADVERTISING, KEY_DATE];

/// String key/value backend, shaped like browser `localStorage`.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------
// Backends
// ---------------------------------------------------------------

/// In-process backend.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// JSON-file backend. Each mutation rewrites the file via temp file + rename.
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the file at `path`. A missing or corrupt file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load_entries(&path);
        info!(
            "FileStorage opened: {} keys, path={}",
            entries.len(),
            path.display()
        );
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(path: &Path) -> BTreeMap<String, String> {
        let Ok(raw) = std::fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Consent file {} is corrupt, starting empty: {}", path.display(), e);
            BTreeMap::new()
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        apply(&mut next);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        self.mutate(|m| {
            m.remove(key);
        })
    }
}

// ---------------------------------------------------------------
// ConsentStore
// ---------------------------------------------------------------

/// Reads and writes the consent record. No business logic.
#[derive(Clone)]
pub struct ConsentStore {
    backend: Arc<dyn KeyValueStorage>,
}

impl ConsentStore {
    pub fn new(backend: Arc<dyn KeyValueStorage>) -> Self {
        Self { backend }
    }

    /// Read the stored record. Never fails; a missing or unparseable date yields `None`.
    pub fn read(&self) -> Option<ConsentRecord> {
        let raw_date = self.backend.get(KEY_DATE)?;
        let consented_at = match DateTime::parse_from_rfc3339(&raw_date) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!("Unparseable {} value {:?}: {}", KEY_DATE, raw_date, e);
                return None;
            }
        };

        // Essential storage cannot be refused, so `consent-essential` is written
        // but never read back; the record always reports `essential: true`.
        let record = ConsentRecord::new(
            self.read_flag(KEY_ANALYTICS),
            self.read_flag(KEY_ADVERTISING),
            consented_at,
        );
        debug!(
            "Stored consent: analytics={}, advertising={}, date={}",
            record.analytics,
            record.advertising,
            raw_date
        );
        Some(record)
    }

    fn read_flag(&self, key: &str) -> bool {
        self.backend.get(key).as_deref() == Some("true")
    }

    /// Persist all four keys.
    ///
    /// The date is removed first and written last, so an interrupted write
    /// reads back as "no record" instead of new flags under an old date.
    pub fn write(&self, record: &ConsentRecord) -> Result<()> {
        self.backend.remove(KEY_DATE)?;
        self.backend.set(KEY_ESSENTIAL, "true")?;
        self.backend.set(KEY_ANALYTICS, bool_str(record.analytics))?;
        self.backend.set(KEY_ADVERTISING, bool_str(record.advertising))?;
        self.backend.set(KEY_DATE, &record.date_string())?;
        Ok(())
    }

    /// Remove all consent keys. Attempts every key before reporting the first failure.
    pub fn clear(&self) -> Result<()> {
        let mut first_err = None;
        for key in CONSENT_KEYS {
            if let Err(e) = self.backend.remove(key) {
                warn!("Failed to remove {}: {}", key, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> (ConsentStore, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        (ConsentStore::new(backend.clone()), backend)
    }

    /// Backend that refuses to write one key.
    struct FailOnKey {
        inner: MemoryStorage,
        key: &'static str,
    }

    impl KeyValueStorage for FailOnKey {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                return Err(Error::Storage("quota exceeded".into()));
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_write_then_read() {
        let (store, backend) = memory_store();
        let record = ConsentRecord::new(true, false, Utc::now());
        store.write(&record).unwrap();

        assert_eq!(store.read(), Some(record));
        assert_eq!(backend.get(KEY_ESSENTIAL).as_deref(), Some("true"));
        assert_eq!(backend.get(KEY_ANALYTICS).as_deref(), Some("true"));
        assert_eq!(backend.get(KEY_ADVERTISING).as_deref(), Some("false"));
    }

    #[test]
    fn test_empty_store_is_undecided() {
        let (store, _) = memory_store();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_missing_date_is_undecided() {
        let (store, backend) = memory_store();
        backend.set(KEY_ANALYTICS, "true").unwrap();
        backend.set(KEY_ADVERTISING, "true").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_malformed_date_is_undecided() {
        let (store, backend) = memory_store();
        backend.set(KEY_ANALYTICS, "true").unwrap();
        backend.set(KEY_DATE, "last tuesday").unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn test_missing_or_garbled_flags_read_false() {
        let (store, backend) = memory_store();
        backend.set(KEY_ESSENTIAL, "false").unwrap();
        backend.set(KEY_ANALYTICS, "yes").unwrap();
        backend.set(KEY_DATE, "2026-01-01T00:00:00Z").unwrap();

        let record = store.read().unwrap();
        assert!(record.essential);
        assert!(!record.analytics);
        assert!(!record.advertising);
    }

    #[test]
    fn test_interrupted_write_reads_as_undecided() {
        let backend = Arc::new(FailOnKey {
            inner: MemoryStorage::new(),
            key: KEY_DATE,
        });
        backend.inner.set(KEY_ANALYTICS, "false").unwrap();
        backend.inner.set(KEY_ADVERTISING, "false").unwrap();
        backend.inner.set(KEY_DATE, "2026-01-01T00:00:00Z").unwrap();
        let store = ConsentStore::new(backend);

        let err = store.write(&ConsentRecord::new(true, true, Utc::now()));
        assert!(err.is_err());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_rewrite_drops_stale_date_before_flags() {
        let backend = Arc::new(FailOnKey {
            inner: MemoryStorage::new(),
            key: KEY_ADVERTISING,
        });
        backend.inner.set(KEY_DATE, "2020-01-01T00:00:00Z").unwrap();
        let store = ConsentStore::new(backend.clone());

        assert!(store.write(&ConsentRecord::new(true, true, Utc::now())).is_err());
        assert!(backend.get(KEY_DATE).is_none());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let (store, backend) = memory_store();
        store.write(&ConsentRecord::new(true, true, Utc::now())).unwrap();
        assert_eq!(backend.len(), 4);

        store.clear().unwrap();
        assert!(backend.is_empty());
        assert!(store.read().is_none());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("consent.json");
        let record = ConsentRecord::new(false, true, Utc::now());

        {
            let store = ConsentStore::new(Arc::new(FileStorage::open(&path)));
            store.write(&record).unwrap();
        }

        let reopened = ConsentStore::new(Arc::new(FileStorage::open(&path)));
        assert_eq!(reopened.read(), Some(record));

        reopened.clear().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let on_disk: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert!(on_disk.is_empty());
    }

    #[test]
    fn test_file_storage_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consent.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::open(&path);
        assert!(storage.get(KEY_DATE).is_none());

        storage.set(KEY_ANALYTICS, "true").unwrap();
        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get(KEY_ANALYTICS).as_deref(), Some("true"));
    }
}
