use domain::Watchlist;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("watchlist file {path} not found")]
    NotFound { path: PathBuf },

    #[error("failed to access watchlist file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watchlist file {path} is not a JSON array of ids: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize watchlist for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage abstraction for the watchlist carried between runs
pub trait WatchlistStore: Send + Sync {
    /// Read the stored watchlist
    fn load(&self) -> Result<Watchlist, StoreError>;

    /// Replace the stored watchlist
    fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError>;
}

/// Watchlist kept as a JSON array in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl WatchlistStore for JsonFileStore {
    fn load(&self) -> Result<Watchlist, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(err) => return Err(self.io_error(err)),
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        let body = serde_json::to_vec(watchlist).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        // Write next to the target and rename so readers never see a partial file
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "watchlist.json".to_string());
        let tmp_path = dir.join(format!(".{file_name}.tmp"));

        let mut tmp = fs::File::create(&tmp_path).map_err(|err| self.io_error(err))?;
        tmp.write_all(&body).map_err(|err| self.io_error(err))?;
        tmp.sync_all().map_err(|err| self.io_error(err))?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path).map_err(|err| self.io_error(err))?;

        tracing::debug!(
            event = "watchlist_saved",
            path = %self.path.display(),
            len = watchlist.len(),
            "watchlist written"
        );
        Ok(())
    }
}

/// In-memory implementation of the WatchlistStore trait.
///
/// Counts writes so callers can check whether a run persisted anything.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    watchlist: Arc<RwLock<Option<Watchlist>>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store; `load` fails until something is saved
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `watchlist`
    pub fn with_watchlist(watchlist: Watchlist) -> Self {
        Self {
            watchlist: Arc::new(RwLock::new(Some(watchlist))),
            saves: AtomicUsize::new(0),
        }
    }

    /// Current content, if any was stored
    pub fn snapshot(&self) -> Option<Watchlist> {
        self.watchlist
            .read()
            .expect("Failed to acquire read lock on watchlist")
            .clone()
    }

    /// Number of successful `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl WatchlistStore for InMemoryStore {
    fn load(&self) -> Result<Watchlist, StoreError> {
        self.snapshot().ok_or_else(|| StoreError::NotFound {
            path: PathBuf::from("<memory>"),
        })
    }

    fn save(&self, watchlist: &Watchlist) -> Result<(), StoreError> {
        *self
            .watchlist
            .write()
            .expect("Failed to acquire write lock on watchlist") = Some(watchlist.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::VideoId;
    use pretty_assertions::assert_eq;

    fn watchlist(raw: &[&str]) -> Watchlist {
        raw.iter().map(|id| VideoId::from(*id)).collect()
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn write_errors_are_not_reported_as_parse_errors() {
        let source = serde_json::from_str::<Watchlist>("[").unwrap_err();
        let err = StoreError::Serialize {
            path: PathBuf::from("data.json"),
            source,
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to serialize watchlist for data.json"));
        assert!(!message.contains("is not a JSON array"));
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(&path);

        store.save(&watchlist(&["v3", "v1", "v2"])).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), r#"["v3","v1","v2"]"#);
        assert_eq!(store.load().unwrap(), watchlist(&["v3", "v1", "v2"]));
    }

    #[test]
    fn save_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::new(&path);

        store.save(&watchlist(&["a", "b", "c", "d"])).unwrap();
        store.save(&watchlist(&["e"])).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), r#"["e"]"#);
        assert!(!dir.path().join(".data.json.tmp").exists());
    }

    #[test]
    fn in_memory_store_counts_saves() {
        let store = InMemoryStore::new();
        assert!(store.load().is_err());

        store.save(&watchlist(&["v1"])).unwrap();
        store.save(&watchlist(&["v1", "v2"])).unwrap();

        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load().unwrap(), watchlist(&["v1", "v2"]));
    }
}
