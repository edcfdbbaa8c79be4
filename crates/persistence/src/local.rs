//! Guest persistence in a local key/value store.
//!
//! Each part of the closet is one JSON string under a fixed key. A missing
//! or corrupt value reads as the empty/default value, never as an error, so
//! a damaged local file cannot lock a guest out of the app.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::backend::{ChangeFeed, ClosetBackend};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::view::{ClosetView, Mutation};

pub const ITEMS_KEY: &str = "closet.items";
pub const INSPIRATIONS_KEY: &str = "closet.inspirations";
pub const PREFERENCES_KEY: &str = "closet.preferences";

#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<dyn KeyValueStore>,
}

impl LocalBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Decode the value under `key`, defaulting when missing or corrupt.
    async fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(raw) = self.store.get(key).await? else {
            debug!(key, "No stored value, using default");
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "Corrupt stored value, using default");
                Ok(T::default())
            }
        }
    }
}

#[async_trait]
impl ClosetBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load(&self) -> Result<ClosetView> {
        Ok(ClosetView {
            catalog: self.read_or_default(ITEMS_KEY).await?,
            inspirations: self.read_or_default(INSPIRATIONS_KEY).await?,
            preferences: self.read_or_default(PREFERENCES_KEY).await?,
        })
    }

    fn attach(&self) -> Option<ChangeFeed> {
        None
    }

    async fn persist(&self, mutation: &Mutation, snapshot: &ClosetView) -> Result<()> {
        let (key, value) = match mutation {
            Mutation::AddItem(_) | Mutation::RemoveItem(_) => {
                (ITEMS_KEY, serde_json::to_string(&snapshot.catalog)?)
            }
            Mutation::SaveInspiration(_) | Mutation::RemoveInspiration(_) => {
                (INSPIRATIONS_KEY, serde_json::to_string(&snapshot.inspirations)?)
            }
            Mutation::UpdatePreferences(_) => {
                (PREFERENCES_KEY, serde_json::to_string(&snapshot.preferences)?)
            }
        };
        self.store.set(key, value).await
    }
}
