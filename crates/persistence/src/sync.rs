//! Keeps the closet view in step with the backend chosen by identity.
//!
//! ## Algorithm
//! On every identity change:
//! 1. Abort the previous subscription task, if any
//! 2. Attach to the new backend's change feed, if it has one
//! 3. Flush queued writes and load the closet from the new backend
//! 4. Replace the view (or reset it to the default view if loading failed)
//!    and the session's backend and write queue in one step
//! 5. Start the feed, replaying changes that arrived during the load
//!
//! Mutations are optimistic: the view changes immediately, and the write is
//! queued for the session's backend. One task per session drains the queue
//! in order. A failed write is logged and never rolled back. A handle is
//! returned so callers that care (the CLI, tests) can wait for it.

use std::sync::Arc;

use closet_model::{
    Catalog, ClothingItem, Inspiration, InspirationId, ItemId, OutfitSuggestion, PreferencesPatch,
    UserPreferences,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::backend::ClosetBackend;
use crate::document::DocumentStore;
use crate::error::Result;
use crate::identity::Identity;
use crate::kv::KeyValueStore;
use crate::local::LocalBackend;
use crate::remote::RemoteBackend;
use crate::view::{ClosetView, Mutation, SharedView};
use crate::writes::WriteQueue;

/// The two stores an identity can map to.
#[derive(Clone)]
pub struct Backends {
    pub documents: Arc<dyn DocumentStore>,
    pub local: Arc<dyn KeyValueStore>,
}

impl Backends {
    pub fn new(documents: Arc<dyn DocumentStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self { documents, local }
    }

    /// Pick the backend strategy for `identity`.
    pub fn for_identity(&self, identity: &Identity) -> Arc<dyn ClosetBackend> {
        match identity {
            Identity::Guest => Arc::new(LocalBackend::new(self.local.clone())),
            Identity::SignedIn { user_id } => {
                Arc::new(RemoteBackend::new(self.documents.clone(), user_id.clone()))
            }
        }
    }
}

/// The identity currently driving the view
struct Session {
    identity: Identity,
    backend: Arc<dyn ClosetBackend>,
    subscription: Option<JoinHandle<()>>,
    /// Created on the first write; replaced on every switch.
    writer: Option<WriteQueue>,
}

pub struct ClosetSync {
    backends: Backends,
    view: SharedView,
    session: Mutex<Session>,
    /// Serializes identity switches; held across the load.
    switching: tokio::sync::Mutex<()>,
}

impl ClosetSync {
    /// Start as a guest with an empty view. Call
    /// [`switch_identity`](Self::switch_identity) to load anything.
    pub fn new(backends: Backends) -> Self {
        let backend = backends.for_identity(&Identity::Guest);
        Self {
            backends,
            view: ClosetView::default().shared(),
            session: Mutex::new(Session {
                identity: Identity::Guest,
                backend,
                subscription: None,
                writer: None,
            }),
            switching: tokio::sync::Mutex::new(()),
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn identity(&self) -> Identity {
        self.session.lock().identity.clone()
    }

    pub fn backend_name(&self) -> &'static str {
        self.session.lock().backend.name()
    }

    /// Move the view over to `identity`'s backend.
    ///
    /// Until the new view is installed, mutations still belong to the
    /// previous identity: they change its view and are written to its
    /// backend. The swap of view, backend and write queue happens under one
    /// lock, so no mutation can pair one identity's view with another's
    /// storage.
    ///
    /// If loading fails the view is left at the default view and the error
    /// is returned; the session still belongs to `identity`.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn switch_identity(&self, identity: Identity) -> Result<()> {
        let _guard = self.switching.lock().await;
        let backend = self.backends.for_identity(&identity);

        // Step 1: stop following the previous backend
        let previous = self.session.lock().subscription.take();
        if let Some(previous) = previous {
            previous.abort();
            let _ = previous.await;
        }

        // Step 2: attach the new feed so changes made during the load are kept
        let feed = backend.attach();

        // Step 3: let queued writes land, then load
        let flushed = self.session.lock().writer.as_ref().map(WriteQueue::flush);
        if let Some(flushed) = flushed {
            let _ = flushed.await;
        }
        let loaded = backend.load().await;

        // Step 4: swap view, backend and write queue together
        let mut session = self.session.lock();
        let mut view = self.view.write();
        let result = match loaded {
            Ok(loaded) => {
                info!(
                    backend = backend.name(),
                    items = loaded.catalog.len(),
                    inspirations = loaded.inspirations.len(),
                    "Closet loaded"
                );
                *view = loaded;
                Ok(())
            }
            Err(e) => {
                error!(backend = backend.name(), error = %e, "Failed to load closet");
                *view = ClosetView::default();
                Err(e)
            }
        };
        drop(view);

        // Writes made during the load still go to the previous backend. The
        // new queue starts once they are done.
        let previous_writes = session.writer.take().map(WriteQueue::close);
        session.writer = Some(WriteQueue::spawn(backend.clone(), previous_writes));
        session.identity = identity;
        session.backend = backend;

        // Step 5: replay what arrived during the load, then keep following
        session.subscription = feed.map(|feed| feed.start(self.view.clone()));

        result
    }

    /// Follow an identity signal, switching on every change.
    ///
    /// The current value is applied first. The task ends when the sender is
    /// dropped.
    pub fn watch_identity(
        self: Arc<Self>,
        mut identities: watch::Receiver<Identity>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                // The error was already logged by the switch itself.
                let _ = self.switch_identity(identity).await;
                if identities.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    pub fn snapshot(&self) -> ClosetView {
        self.view.read().clone()
    }

    pub fn catalog(&self) -> Catalog {
        self.view.read().catalog.clone()
    }

    pub fn items(&self) -> Vec<ClothingItem> {
        self.view.read().catalog.to_vec()
    }

    pub fn item(&self, id: &str) -> Option<ClothingItem> {
        self.view.read().catalog.get(id).cloned()
    }

    pub fn inspirations(&self) -> Vec<Inspiration> {
        self.view.read().inspirations.clone()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.view.read().preferences.clone()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn add_item(&self, item: ClothingItem) -> JoinHandle<()> {
        self.commit(Mutation::AddItem(item))
    }

    /// Returns `None` (and writes nothing) when the item is not in the view.
    pub fn remove_item(&self, id: &str) -> Option<JoinHandle<()>> {
        if !self.view.read().catalog.contains(id) {
            return None;
        }
        Some(self.commit(Mutation::RemoveItem(id.to_string())))
    }

    /// Snapshot a suggestion's items from the live catalog and store it.
    ///
    /// Ids that are no longer in the catalog are skipped.
    pub fn save_inspiration(&self, suggestion: &OutfitSuggestion) -> (Inspiration, JoinHandle<()>) {
        let items = {
            let view = self.view.read();
            let (found, missing) = view.catalog.resolve(&suggestion.item_ids);
            for id in missing {
                warn!(item_id = %id, "Suggested item is no longer in the catalog, skipping");
            }
            found.into_iter().cloned().collect()
        };

        let inspiration = Inspiration::new(suggestion.description.clone(), items);
        let handle = self.commit(Mutation::SaveInspiration(inspiration.clone()));
        (inspiration, handle)
    }

    /// Returns `None` when no inspiration has this id.
    pub fn remove_inspiration(&self, id: &InspirationId) -> Option<JoinHandle<()>> {
        if !self.view.read().inspirations.iter().any(|i| &i.id == id) {
            return None;
        }
        Some(self.commit(Mutation::RemoveInspiration(id.clone())))
    }

    pub fn update_preferences(&self, patch: PreferencesPatch) -> JoinHandle<()> {
        self.commit(Mutation::UpdatePreferences(patch))
    }

    /// Apply `mutation` to the view now, persist it in the background.
    ///
    /// The session lock is held across the apply and the enqueue, so the
    /// write goes to the backend of the identity whose view was changed, and
    /// queue order matches apply order.
    fn commit(&self, mutation: Mutation) -> JoinHandle<()> {
        let mut session = self.session.lock();
        let snapshot = {
            let mut view = self.view.write();
            view.apply(&mutation);
            view.clone()
        };

        let backend = session.backend.clone();
        session
            .writer
            .get_or_insert_with(|| WriteQueue::spawn(backend, None))
            .push(mutation, snapshot)
    }

    /// Ids of the catalog items, in order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.view.read().catalog.ids().to_vec()
    }
}

impl Drop for ClosetSync {
    fn drop(&mut self) {
        if let Some(subscription) = self.session.get_mut().subscription.take() {
            subscription.abort();
        }
    }
}
