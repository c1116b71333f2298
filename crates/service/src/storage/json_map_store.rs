use std::{collections::HashMap, path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::KvStore;
use crate::errors::StorageError;

/// JSON file-backed key-value store.
///
/// Keeps the whole map in memory and rewrites the file after every mutation.
/// A mutation is applied to a copy of the map, written to a sibling temp file
/// and renamed over the store file; the in-memory map only changes once the
/// rename succeeded. The write lock is held throughout, so snapshots land on
/// disk in mutation order. Meant for single-node deployments and local development.
#[derive(Clone)]
pub struct FileKvStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
    file_path: PathBuf,
}

impl FileKvStore {
    /// Open the store at `path`, creating the file with an empty map if missing.
    /// A file that does not hold a JSON object of strings is rejected.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StorageError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(StorageError::backend)?;
        }

        let map: HashMap<String, String> = match fs::read(&file_path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", file_path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = HashMap::new();
                write_snapshot(&file_path, &empty).await?;
                empty
            }
            Err(e) => return Err(StorageError::backend(e)),
        };
        debug!(path = %file_path.display(), entries = map.len(), "file store opened");

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn snapshot_tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_snapshot(path: &Path, map: &HashMap<String, String>) -> Result<(), StorageError> {
    let data = serde_json::to_vec(map).map_err(StorageError::backend)?;
    let tmp = snapshot_tmp_path(path);
    fs::write(&tmp, data).await.map_err(StorageError::backend)?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::backend(e));
    }
    Ok(())
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.inner.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        next.insert(key.to_string(), value);
        write_snapshot(&self.file_path, &next).await?;
        *map = next;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String) -> Result<bool, StorageError> {
        let mut map = self.inner.write().await;
        if map.contains_key(key) {
            return Ok(false);
        }
        let mut next = map.clone();
        next.insert(key.to_string(), value);
        write_snapshot(&self.file_path, &next).await?;
        *map = next;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut map = self.inner.write().await;
        if !map.contains_key(key) {
            return Ok(false);
        }
        let mut next = map.clone();
        next.remove(key);
        write_snapshot(&self.file_path, &next).await?;
        *map = next;
        Ok(true)
    }
}
