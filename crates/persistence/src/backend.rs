use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::view::{ClosetView, Mutation, SharedView};

/// A change feed that is already receiving but not yet applying.
///
/// Backends hand one out before loading, so changes written while the load
/// runs are buffered. [`start`](Self::start) replays them onto the loaded
/// view and keeps following.
pub struct ChangeFeed {
    start: Box<dyn FnOnce(SharedView) -> JoinHandle<()> + Send>,
}

impl ChangeFeed {
    pub fn new(start: impl FnOnce(SharedView) -> JoinHandle<()> + Send + 'static) -> Self {
        Self {
            start: Box::new(start),
        }
    }

    /// Spawn the task applying buffered and future changes to `view`.
    pub fn start(self, view: SharedView) -> JoinHandle<()> {
        (self.start)(view)
    }
}

/// Where one identity's closet lives.
///
/// The sync layer picks an implementation per identity and talks to it only
/// through this trait: a full load on sign-in, an optional live
/// subscription, and one write per optimistic mutation.
#[async_trait]
pub trait ClosetBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Read the whole closet.
    async fn load(&self) -> Result<ClosetView>;

    /// Attach to the backend's change feed.
    ///
    /// Called before [`load`](Self::load). Returns `None` for backends
    /// without a change feed. The caller owns the started task and aborts
    /// it on identity change.
    fn attach(&self) -> Option<ChangeFeed>;

    /// Persist `mutation`. `snapshot` is the view right after it was applied.
    ///
    /// Writes for one session arrive one at a time, in the order the
    /// mutations were applied.
    async fn persist(&self, mutation: &Mutation, snapshot: &ClosetView) -> Result<()>;
}
