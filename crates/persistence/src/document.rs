//! Hierarchical JSON document store with change notifications.
//!
//! Paths are slash-separated (`users/u1/items/i9`). A *collection* is a path
//! whose direct children are documents; [`DocumentStore::list`] only returns
//! direct children, never deeper descendants.
//!
//! [`InMemoryDocumentStore`] fans every change out over a
//! `tokio::sync::broadcast` channel, so any number of sessions can follow
//! it. A receiver that falls behind sees `RecvError::Lagged` and is expected
//! to reload its snapshot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{PersistenceError, Result};

/// Default buffer capacity for the change channel
const DEFAULT_CAPACITY: usize = 256;

/// A document was written (`Some`) or deleted (`None`).
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub path: String,
    pub value: Option<Value>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Shallow-merge `value` into the document at `path`.
    ///
    /// Top-level fields of an object replace the stored ones; anything else
    /// replaces the whole document. Missing documents are created.
    async fn set_merge(&self, path: &str, value: Value) -> Result<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Direct child documents of `collection`, ordered by path.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>>;

    /// Follow every subsequent change to the store.
    fn subscribe(&self) -> broadcast::Receiver<DocumentChange>;
}

/// Trim surrounding slashes and reject empty or hollow paths.
pub fn normalize_path(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return Err(PersistenceError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Merge `incoming` into `existing` one level deep.
fn shallow_merge(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(mut current)), Value::Object(update)) => {
            for (key, value) in update {
                current.insert(key, value);
            }
            Value::Object(current)
        }
        (_, incoming) => incoming,
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// Process-local document store.
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Value>>,
    changes: broadcast::Sender<DocumentChange>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store whose change channel buffers `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            documents: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn publish(&self, path: String, value: Option<Value>) {
        // No receivers is fine: nobody is following this store yet.
        let _ = self.changes.send(DocumentChange { path, value });
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let path = normalize_path(path)?;
        Ok(self.documents.read().get(&path).cloned())
    }

    async fn set_merge(&self, path: &str, value: Value) -> Result<()> {
        let path = normalize_path(path)?;
        let merged = {
            let mut documents = self.documents.write();
            let merged = shallow_merge(documents.remove(&path), value);
            documents.insert(path.clone(), merged.clone());
            merged
        };
        debug!(%path, "Document written");
        self.publish(path, Some(merged));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;
        let removed = self.documents.write().remove(&path).is_some();
        if removed {
            debug!(%path, "Document deleted");
            self.publish(path, None);
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let prefix = format!("{}/", normalize_path(collection)?);
        let documents = self.documents.read();
        Ok(documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/u1/").unwrap(), "users/u1");
        assert!(normalize_path("").is_err());
        assert!(normalize_path("users//items").is_err());
    }

    #[tokio::test]
    async fn test_set_merge_is_shallow() {
        let store = InMemoryDocumentStore::new();
        store
            .set_merge("users/u1", json!({"gender": "male", "sizes": {"top": "M", "shoes": "42"}}))
            .await
            .unwrap();
        store
            .set_merge("users/u1", json!({"sizes": {"top": "L"}}))
            .await
            .unwrap();

        let doc = store.get("users/u1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"gender": "male", "sizes": {"top": "L"}}));
    }

    #[tokio::test]
    async fn test_list_returns_direct_children_only() {
        let store = InMemoryDocumentStore::new();
        store.set_merge("users/u1", json!({})).await.unwrap();
        store.set_merge("users/u1/items/b", json!({"n": 2})).await.unwrap();
        store.set_merge("users/u1/items/a", json!({"n": 1})).await.unwrap();
        store.set_merge("users/u1/items/a/notes/x", json!({})).await.unwrap();
        store.set_merge("users/u1/itemsX/z", json!({})).await.unwrap();

        let listed = store.list("users/u1/items").await.unwrap();
        let paths: Vec<_> = listed.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["users/u1/items/a", "users/u1/items/b"]);
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let store = InMemoryDocumentStore::new();
        let mut rx = store.subscribe();

        store.set_merge("users/u1/items/a", json!({"n": 1})).await.unwrap();
        store.delete("users/u1/items/a").await.unwrap();
        // A second delete is a silent no-op.
        store.delete("users/u1/items/a").await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.path, "users/u1/items/a");
        assert_eq!(first.value, Some(json!({"n": 1})));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.value, None);
        assert!(rx.try_recv().is_err());
    }
}
