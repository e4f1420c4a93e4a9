//! Key-value store persisted as a single JSON object on disk.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::dao::storage::{KeyValueStore, StorageError, StorageResult};

const STORE_FILE_NAME: &str = "store.json";

/// File-backed [`KeyValueStore`].
///
/// The whole map is kept in memory and rewritten on every mutation through a temporary
/// file followed by a rename, so a crash never leaves a half-written store behind. The
/// in-memory map only takes a mutation once it is on disk.
#[derive(Clone)]
pub struct FileStore {
    path: Arc<Path>,
    entries: Arc<Mutex<IndexMap<String, String>>>,
}

impl FileStore {
    /// Open (or create) the store inside `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).await.map_err(|source| {
            StorageError::unavailable(format!("creating `{}`", data_dir.display()), source)
        })?;

        let path = data_dir.join(STORE_FILE_NAME);
        let entries = match fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<IndexMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "store file is corrupt; starting from an empty store"
                    );
                    IndexMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => IndexMap::new(),
            Err(err) => {
                return Err(StorageError::unavailable(
                    format!("reading `{}`", path.display()),
                    err,
                ));
            }
        };

        debug!(path = %path.display(), keys = entries.len(), "opened local store");

        Ok(Self {
            path: Arc::from(path),
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    async fn flush(path: &Path, entries: &IndexMap<String, String>) -> StorageResult<()> {
        let encoded = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Encode {
            key: STORE_FILE_NAME.to_string(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encoded).await.map_err(|source| {
            StorageError::unavailable(format!("writing `{}`", tmp.display()), source)
        })?;
        fs::rename(&tmp, path).await.map_err(|source| {
            StorageError::unavailable(format!("replacing `{}`", path.display()), source)
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            let entries = store.entries.lock().await;
            Ok(entries.get(&key).cloned())
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = store.entries.lock().await;
            let mut next = entries.clone();
            next.insert(key, value);
            Self::flush(&store.path, &next).await?;
            *entries = next;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = store.entries.lock().await;
            if !entries.contains_key(&key) {
                return Ok(());
            }
            let mut next = entries.clone();
            next.shift_remove(&key);
            Self::flush(&store.path, &next).await?;
            *entries = next;
            Ok(())
        })
    }
}
