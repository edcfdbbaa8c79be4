//! String key/value storage for guest sessions.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PersistenceError, Result};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// File-backed store
// ============================================================================

/// One `<key>.json` file per key under a data directory.
///
/// Characters outside `[A-Za-z0-9._-]` in a key are replaced by `_`, so
/// keys can never escape the directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io("read", path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError::io("create", &self.dir, e))?;

        // Write beside the target, then rename over it. Each write stages
        // under its own name so concurrent writers never share a file.
        let path = self.path_for(key);
        let staging = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&staging, value)
            .await
            .map_err(|e| PersistenceError::io("write", &staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| PersistenceError::io("replace", &path, e))?;

        debug!(path = %path.display(), "Stored key");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io("remove", path, e)),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_sanitized() {
        let store = FileKeyValueStore::new("/data");
        assert_eq!(store.path_for("closet.items"), Path::new("/data/closet.items.json"));
        assert_eq!(store.path_for("../etc/passwd"), Path::new("/data/.._etc_passwd.json"));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        assert_eq!(store.get("closet.items").await.unwrap(), None);

        store.set("closet.items", "[]".to_string()).await.unwrap();
        store.set("closet.items", "[1]".to_string()).await.unwrap();
        assert_eq!(store.get("closet.items").await.unwrap().as_deref(), Some("[1]"));

        store.remove("closet.items").await.unwrap();
        store.remove("closet.items").await.unwrap();
        assert_eq!(store.get("closet.items").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_to_one_key_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileKeyValueStore::new(dir.path()));

        let writes: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.set("closet.items", format!("[{i}]")).await })
            })
            .collect();
        for write in writes {
            write.await.unwrap().unwrap();
        }

        let stored = store.get("closet.items").await.unwrap().unwrap();
        assert!(stored.starts_with('[') && stored.ends_with(']'));
        // No staging file is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
