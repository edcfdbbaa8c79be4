//! Integration tests for identity switching and optimistic mutations.

use async_trait::async_trait;
use closet_model::{
    ClothingItem, ImagePayload, ItemClassification, OutfitSuggestion, PreferencesPatch,
    UserPreferences,
};
use persistence::{
    Backends, ClosetBackend, ClosetSync, DocumentChange, DocumentStore, FileKeyValueStore,
    Identity, InMemoryDocumentStore, ITEMS_KEY, KeyValueStore, LocalBackend, MemoryKeyValueStore,
    PersistenceError, PREFERENCES_KEY,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

// ============================================================================
// Helpers
// ============================================================================

fn item(id: &str, category: &str, sub_category: &str) -> ClothingItem {
    ClothingItem::with_id(
        id,
        ImagePayload::from_bytes("image/png", &[1, 2, 3]),
        ItemClassification {
            category: category.to_string(),
            sub_category: sub_category.to_string(),
            tags: vec!["casual".to_string()],
            ..ItemClassification::unknown()
        },
    )
}

fn memory_backends() -> (Arc<InMemoryDocumentStore>, Arc<MemoryKeyValueStore>, Backends) {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let local = Arc::new(MemoryKeyValueStore::new());
    let backends = Backends::new(documents.clone(), local.clone());
    (documents, local, backends)
}

/// Wait (in real time) until `condition` holds, or fail after a second.
async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

/// Records every merge-write before forwarding it
struct RecordingDocuments {
    inner: InMemoryDocumentStore,
    merges: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl DocumentStore for RecordingDocuments {
    async fn get(&self, path: &str) -> persistence::Result<Option<Value>> {
        self.inner.get(path).await
    }

    async fn set_merge(&self, path: &str, value: Value) -> persistence::Result<()> {
        self.merges.lock().unwrap().push((path.to_string(), value.clone()));
        self.inner.set_merge(path, value).await
    }

    async fn delete(&self, path: &str) -> persistence::Result<()> {
        self.inner.delete(path).await
    }

    async fn list(&self, collection: &str) -> persistence::Result<Vec<(String, Value)>> {
        self.inner.list(collection).await
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.inner.subscribe()
    }
}

/// Writes one more document right after the items collection is listed,
/// like another device saving while this one loads
struct WriteDuringLoad {
    inner: InMemoryDocumentStore,
    late: Mutex<Option<(String, Value)>>,
}

#[async_trait]
impl DocumentStore for WriteDuringLoad {
    async fn get(&self, path: &str) -> persistence::Result<Option<Value>> {
        self.inner.get(path).await
    }

    async fn set_merge(&self, path: &str, value: Value) -> persistence::Result<()> {
        self.inner.set_merge(path, value).await
    }

    async fn delete(&self, path: &str) -> persistence::Result<()> {
        self.inner.delete(path).await
    }

    async fn list(&self, collection: &str) -> persistence::Result<Vec<(String, Value)>> {
        let listed = self.inner.list(collection).await?;
        if collection.ends_with("/items") {
            let late = self.late.lock().unwrap().take();
            if let Some((path, value)) = late {
                self.inner.set_merge(&path, value).await?;
            }
        }
        Ok(listed)
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.inner.subscribe()
    }
}

/// A key/value store whose reads take a while
struct SlowStore {
    inner: MemoryKeyValueStore,
    delay: Duration,
}

#[async_trait]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> persistence::Result<Option<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> persistence::Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> persistence::Result<()> {
        self.inner.remove(key).await
    }
}

/// A key/value store that is always down
struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> persistence::Result<Option<String>> {
        Err(PersistenceError::Unavailable("disk detached".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> persistence::Result<()> {
        Err(PersistenceError::Unavailable("disk detached".to_string()))
    }

    async fn remove(&self, _key: &str) -> persistence::Result<()> {
        Err(PersistenceError::Unavailable("disk detached".to_string()))
    }
}

// ============================================================================
// Guest sessions
// ============================================================================

#[tokio::test]
async fn test_guest_with_corrupt_preferences_gets_defaults() {
    let (_, local, backends) = memory_backends();
    local
        .set(PREFERENCES_KEY, "{\"gender\": \"male\", ".to_string())
        .await
        .unwrap();

    let sync = ClosetSync::new(backends);
    sync.switch_identity(Identity::Guest).await.unwrap();

    assert_eq!(sync.preferences(), UserPreferences::default());
    assert_eq!(sync.backend_name(), "local");
}

#[tokio::test]
async fn test_guest_mutations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backends = || {
        Backends::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(FileKeyValueStore::new(dir.path())),
        )
    };

    let sync = ClosetSync::new(backends());
    sync.switch_identity(Identity::Guest).await.unwrap();
    sync.add_item(item("a", "top", "t-shirt")).await.unwrap();
    sync.add_item(item("b", "bottom", "jeans")).await.unwrap();
    sync.remove_item("a").unwrap().await.unwrap();
    sync.update_preferences(PreferencesPatch {
        favorite_colors: Some(vec!["#000000".to_string()]),
        ..PreferencesPatch::default()
    })
    .await
    .unwrap();

    let restarted = ClosetSync::new(backends());
    restarted.switch_identity(Identity::Guest).await.unwrap();

    assert_eq!(restarted.item_ids(), vec!["b".to_string()]);
    assert_eq!(restarted.preferences().favorite_colors, vec!["#000000"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_of_guest_writes_all_reach_disk() {
    for round in 0..5 {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileKeyValueStore::new(dir.path()));
        let sync = ClosetSync::new(Backends::new(
            Arc::new(InMemoryDocumentStore::new()),
            store.clone(),
        ));
        sync.switch_identity(Identity::Guest).await.unwrap();

        let writes: Vec<_> = (0..16)
            .map(|i| sync.add_item(item(&format!("item-{i}"), "top", "t-shirt")))
            .collect();
        for write in writes {
            write.await.unwrap();
        }

        let stored = LocalBackend::new(store).load().await.unwrap();
        assert_eq!(stored.catalog.ids(), sync.item_ids().as_slice(), "round {round}");
        assert_eq!(stored.catalog.len(), 16, "round {round}");
    }
}

#[tokio::test]
async fn test_remove_unknown_item_writes_nothing() {
    let (_, _, backends) = memory_backends();
    let sync = ClosetSync::new(backends);
    assert!(sync.remove_item("missing").is_none());
    assert!(sync.remove_inspiration(&"missing".to_string()).is_none());
}

#[tokio::test]
async fn test_failed_write_keeps_optimistic_state() {
    let backends =
        Backends::new(Arc::new(InMemoryDocumentStore::new()), Arc::new(UnavailableStore));
    let sync = ClosetSync::new(backends);

    sync.add_item(item("a", "top", "t-shirt")).await.unwrap();

    assert_eq!(sync.item_ids(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_failed_load_resets_view() {
    let backends =
        Backends::new(Arc::new(InMemoryDocumentStore::new()), Arc::new(UnavailableStore));
    let sync = ClosetSync::new(backends);
    sync.add_item(item("a", "top", "t-shirt")).await.unwrap();

    let err = sync.switch_identity(Identity::Guest).await.unwrap_err();

    assert!(matches!(err, PersistenceError::Unavailable(_)));
    assert!(sync.items().is_empty());
    assert_eq!(sync.preferences(), UserPreferences::default());
}

#[tokio::test]
async fn test_save_inspiration_skips_unknown_ids() {
    let (_, _, backends) = memory_backends();
    let sync = ClosetSync::new(backends);
    sync.add_item(item("a", "top", "t-shirt")).await.unwrap();

    let suggestion = OutfitSuggestion {
        description: "Easy Sunday".to_string(),
        item_ids: vec!["a".to_string(), "gone".to_string()],
        ..OutfitSuggestion::default()
    };
    let (inspiration, handle) = sync.save_inspiration(&suggestion);
    handle.await.unwrap();

    assert_eq!(inspiration.description, "Easy Sunday");
    assert_eq!(inspiration.items.len(), 1);
    assert_eq!(inspiration.items[0].id, "a");
    assert_eq!(sync.inspirations(), vec![inspiration]);
}

// ============================================================================
// Signed-in sessions
// ============================================================================

#[tokio::test]
async fn test_sign_in_follows_remote_changes() {
    let (documents, _, backends) = memory_backends();
    let sync = ClosetSync::new(backends);
    sync.switch_identity(Identity::signed_in("u1")).await.unwrap();
    assert_eq!(sync.backend_name(), "remote");

    // Another device adds an item and changes preferences.
    let sneakers = serde_json::to_value(item("z", "shoes", "sneakers")).unwrap();
    documents.set_merge("users/u1/items/z", sneakers).await.unwrap();
    documents
        .set_merge("users/u1", json!({"occasions": ["work"]}))
        .await
        .unwrap();

    eventually(|| sync.item("z").is_some() && sync.preferences().occasions == vec!["work"]).await;

    documents.delete("users/u1/items/z").await.unwrap();
    eventually(|| sync.items().is_empty()).await;
}

#[tokio::test]
async fn test_identity_switch_aborts_previous_subscription() {
    let (documents, _, backends) = memory_backends();
    let sync = ClosetSync::new(backends);
    sync.switch_identity(Identity::signed_in("u1")).await.unwrap();
    sync.add_item(item("mine", "top", "shirt")).await.unwrap();

    sync.switch_identity(Identity::Guest).await.unwrap();
    assert!(sync.items().is_empty());

    let polo = serde_json::to_value(item("late", "top", "polo")).unwrap();
    documents.set_merge("users/u1/items/late", polo).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(sync.items().is_empty());
    assert_eq!(sync.identity(), Identity::Guest);
}

#[tokio::test(start_paused = true)]
async fn test_mutation_during_switch_stays_with_previous_identity() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let local = Arc::new(SlowStore {
        inner: MemoryKeyValueStore::new(),
        delay: Duration::from_millis(100),
    });
    let sync = Arc::new(ClosetSync::new(Backends::new(documents.clone(), local.clone())));
    sync.switch_identity(Identity::signed_in("u1")).await.unwrap();
    sync.add_item(item("private-1", "top", "shirt")).await.unwrap();
    sync.add_item(item("private-2", "bottom", "chinos")).await.unwrap();

    // Sign out; the guest closet takes a while to read.
    let switching = tokio::spawn({
        let sync = sync.clone();
        async move { sync.switch_identity(Identity::Guest).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let write = sync.add_item(item("late-add", "shoes", "loafers"));

    switching.await.unwrap().unwrap();
    write.await.unwrap();

    // The guest never sees the signed-in closet, in memory or on disk.
    assert_eq!(sync.identity(), Identity::Guest);
    assert!(sync.items().is_empty());
    assert_eq!(local.inner.get(ITEMS_KEY).await.unwrap(), None);

    // The item went to the closet it was added to.
    assert!(documents.get("users/u1/items/late-add").await.unwrap().is_some());
    assert!(documents.get("users/u1/items/private-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_change_written_during_sign_in_load_reaches_view() {
    let late = serde_json::to_value(item("late", "outerwear", "parka")).unwrap();
    let documents = Arc::new(WriteDuringLoad {
        inner: InMemoryDocumentStore::new(),
        late: Mutex::new(Some(("users/u1/items/late".to_string(), late))),
    });
    let sync = ClosetSync::new(Backends::new(
        documents.clone(),
        Arc::new(MemoryKeyValueStore::new()),
    ));

    sync.switch_identity(Identity::signed_in("u1")).await.unwrap();

    assert!(documents.inner.get("users/u1/items/late").await.unwrap().is_some());
    eventually(|| sync.item("late").is_some()).await;
}

#[tokio::test]
async fn test_remote_preference_update_writes_only_patch_fields() {
    let documents = Arc::new(RecordingDocuments {
        inner: InMemoryDocumentStore::new(),
        merges: Mutex::new(Vec::new()),
    });
    let backends = Backends::new(documents.clone(), Arc::new(MemoryKeyValueStore::new()));
    let sync = ClosetSync::new(backends);
    sync.switch_identity(Identity::signed_in("u1")).await.unwrap();

    sync.update_preferences(PreferencesPatch {
        style_preferences: Some(vec!["minimal".to_string()]),
        ..PreferencesPatch::default()
    })
    .await
    .unwrap();

    let merges = documents.merges.lock().unwrap();
    let (path, body) = merges.last().unwrap();
    assert_eq!(path, "users/u1");
    assert_eq!(body, &json!({"stylePreferences": ["minimal"]}));
}

#[tokio::test]
async fn test_watch_identity_switches_backends() {
    let (_, _, backends) = memory_backends();
    let sync = Arc::new(ClosetSync::new(backends));
    let (tx, rx) = watch::channel(Identity::Guest);

    let watcher = sync.clone().watch_identity(rx);
    eventually(|| sync.backend_name() == "local").await;

    tx.send(Identity::signed_in("u7")).unwrap();
    eventually(|| sync.identity() == Identity::signed_in("u7")).await;
    eventually(|| sync.backend_name() == "remote").await;

    drop(tx);
    watcher.await.unwrap();
}
