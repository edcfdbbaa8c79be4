//! Signed-in persistence over a [`DocumentStore`].
//!
//! ## Layout
//! - `users/<uid>`: the preferences document
//! - `users/<uid>/items/<id>`: one document per clothing item
//! - `users/<uid>/inspirations/<id>`: one document per saved outfit
//!
//! ## Algorithm
//! The change feed is attached first, then load reads all three parts,
//! creating the default preferences document for a first-time user. Once the
//! loaded view is installed the feed task replays what arrived during the
//! load and keeps applying upserts and deletes under this user's prefix.
//! Changes carry whole documents, so replaying one the load already saw is
//! harmless.
//! If the feed lags the task reloads the whole snapshot instead of guessing
//! which changes it missed.
//!
//! Writes are point writes: `set_merge` for upserts, `delete` for removals,
//! and a preferences update sends only the fields present in the patch.

use std::sync::Arc;

use async_trait::async_trait;
use closet_model::{Catalog, ClothingItem, Inspiration, UserPreferences};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::backend::{ChangeFeed, ClosetBackend};
use crate::document::{DocumentChange, DocumentStore};
use crate::error::Result;
use crate::view::{ClosetView, Mutation, SharedView};

/// Which part of a user's closet a document path refers to
#[derive(Debug, PartialEq, Eq)]
enum DocumentKind<'a> {
    Preferences,
    Item(&'a str),
    Inspiration(&'a str),
}

#[derive(Clone)]
pub struct RemoteBackend {
    store: Arc<dyn DocumentStore>,
    user_id: String,
}

impl RemoteBackend {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn preferences_path(&self) -> String {
        format!("users/{}", self.user_id)
    }

    pub fn items_collection(&self) -> String {
        format!("users/{}/items", self.user_id)
    }

    pub fn inspirations_collection(&self) -> String {
        format!("users/{}/inspirations", self.user_id)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{id}", self.items_collection())
    }

    pub fn inspiration_path(&self, id: &str) -> String {
        format!("{}/{id}", self.inspirations_collection())
    }

    /// Classify `path` if it belongs to this user.
    fn classify<'a>(&self, path: &'a str) -> Option<DocumentKind<'a>> {
        let rest = path.strip_prefix("users/")?.strip_prefix(self.user_id.as_str())?;
        if rest.is_empty() {
            return Some(DocumentKind::Preferences);
        }
        let rest = rest.strip_prefix('/')?;
        let (collection, id) = rest.split_once('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        match collection {
            "items" => Some(DocumentKind::Item(id)),
            "inspirations" => Some(DocumentKind::Inspiration(id)),
            _ => None,
        }
    }

    /// Decode every document in a collection, skipping malformed ones.
    async fn load_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let documents = self.store.list(collection).await?;
        Ok(documents
            .into_iter()
            .filter_map(|(path, value)| decode(&path, value))
            .collect())
    }

    async fn load_preferences(&self) -> Result<UserPreferences> {
        let path = self.preferences_path();
        match self.store.get(&path).await? {
            Some(value) => Ok(decode(&path, value).unwrap_or_default()),
            None => {
                info!(user_id = %self.user_id, "Creating default preferences document");
                let defaults = UserPreferences::default();
                self.store
                    .set_merge(&path, serde_json::to_value(&defaults)?)
                    .await?;
                Ok(defaults)
            }
        }
    }

    /// Apply one change from the feed to the view.
    fn apply_change(&self, view: &SharedView, change: DocumentChange) {
        let Some(kind) = self.classify(&change.path) else {
            return;
        };
        debug!(path = %change.path, deleted = change.value.is_none(), "Applying remote change");

        match (kind, change.value) {
            (DocumentKind::Preferences, Some(value)) => {
                if let Some(preferences) = decode::<UserPreferences>(&change.path, value) {
                    view.write().preferences = preferences;
                }
            }
            (DocumentKind::Preferences, None) => {
                view.write().preferences = UserPreferences::default();
            }
            (DocumentKind::Item(_), Some(value)) => {
                if let Some(item) = decode::<ClothingItem>(&change.path, value) {
                    view.write().catalog.insert(item);
                }
            }
            (DocumentKind::Item(id), None) => {
                view.write().catalog.remove(id);
            }
            (DocumentKind::Inspiration(_), Some(value)) => {
                if let Some(inspiration) = decode::<Inspiration>(&change.path, value) {
                    view.write().upsert_inspiration(inspiration);
                }
            }
            (DocumentKind::Inspiration(id), None) => {
                view.write().inspirations.retain(|i| i.id != id);
            }
        }
    }

    /// Follow the change feed until the store goes away or the task is aborted.
    async fn follow(self, view: SharedView, mut changes: Receiver<DocumentChange>) {
        loop {
            match changes.recv().await {
                Ok(change) => self.apply_change(&view, change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, user_id = %self.user_id, "Change feed lagged, reloading closet");
                    match self.load().await {
                        Ok(fresh) => *view.write() = fresh,
                        Err(e) => error!(error = %e, "Reload after lag failed"),
                    }
                }
                Err(RecvError::Closed) => {
                    info!(user_id = %self.user_id, "Change feed closed");
                    break;
                }
            }
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(%path, error = %e, "Skipping malformed document");
            None
        }
    }
}

#[async_trait]
impl ClosetBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load(&self) -> Result<ClosetView> {
        let preferences = self.load_preferences().await?;
        let items: Vec<ClothingItem> = self.load_collection(&self.items_collection()).await?;
        let mut inspirations: Vec<Inspiration> =
            self.load_collection(&self.inspirations_collection()).await?;
        inspirations.sort_by_key(|i| i.created_at);

        Ok(ClosetView {
            catalog: Catalog::from(items),
            inspirations,
            preferences,
        })
    }

    fn attach(&self) -> Option<ChangeFeed> {
        // The receiver buffers from here on, including during the load.
        let changes = self.store.subscribe();
        let backend = self.clone();
        Some(ChangeFeed::new(move |view| tokio::spawn(backend.follow(view, changes))))
    }

    async fn persist(&self, mutation: &Mutation, _snapshot: &ClosetView) -> Result<()> {
        match mutation {
            Mutation::AddItem(item) => {
                self.store
                    .set_merge(&self.item_path(&item.id), serde_json::to_value(item)?)
                    .await
            }
            Mutation::RemoveItem(id) => self.store.delete(&self.item_path(id)).await,
            Mutation::SaveInspiration(inspiration) => {
                self.store
                    .set_merge(
                        &self.inspiration_path(&inspiration.id),
                        serde_json::to_value(inspiration)?,
                    )
                    .await
            }
            Mutation::RemoveInspiration(id) => self.store.delete(&self.inspiration_path(id)).await,
            Mutation::UpdatePreferences(patch) => {
                self.store
                    .set_merge(&self.preferences_path(), serde_json::to_value(patch)?)
                    .await
            }
        }
    }
}
