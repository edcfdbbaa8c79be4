//! # Persistence Crate
//!
//! Identity-dependent storage for the closet and the synchronization layer
//! that mirrors it in memory.
//!
//! ## Components
//!
//! ### Stores
//! - [`DocumentStore`]: hierarchical JSON documents with a change feed
//!   ([`InMemoryDocumentStore`])
//! - [`KeyValueStore`]: flat string values ([`FileKeyValueStore`],
//!   [`MemoryKeyValueStore`])
//!
//! ### Backends
//! - [`RemoteBackend`]: signed-in users, one document per item/inspiration
//! - [`LocalBackend`]: guests, one JSON string per part of the closet
//!
//! ### Sync
//! [`ClosetSync`] owns the [`ClosetView`], switches backends when the
//! [`Identity`] changes and applies mutations optimistically. Writes for a
//! session are queued and persisted one at a time, in apply order.
//!
//! ## Example Usage
//!
//! ```ignore
//! use persistence::{Backends, ClosetSync, FileKeyValueStore, Identity, InMemoryDocumentStore};
//! use std::sync::Arc;
//!
//! let backends = Backends::new(
//!     Arc::new(InMemoryDocumentStore::new()),
//!     Arc::new(FileKeyValueStore::new(".closet")),
//! );
//! let sync = ClosetSync::new(backends);
//! sync.switch_identity(Identity::Guest).await?;
//!
//! sync.add_item(item).await?; // wait for the write if you need to
//! ```

pub mod backend;
pub mod document;
pub mod error;
pub mod identity;
pub mod kv;
pub mod local;
pub mod remote;
pub mod sync;
pub mod view;
mod writes;

pub use backend::{ChangeFeed, ClosetBackend};
pub use document::{DocumentChange, DocumentStore, InMemoryDocumentStore};
pub use error::{PersistenceError, Result};
pub use identity::Identity;
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use local::{INSPIRATIONS_KEY, ITEMS_KEY, LocalBackend, PREFERENCES_KEY};
pub use remote::RemoteBackend;
pub use sync::{Backends, ClosetSync};
pub use view::{ClosetView, Mutation, SharedView};
