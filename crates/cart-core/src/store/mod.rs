use crate::models::ShoppingList;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Errors surfaced by remote writes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (offline, connect failure, timeout).
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The store answered but refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Events delivered to a subscription sink.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The complete current set of lists matching the subscribed owner,
    /// never a delta. Sent immediately on registration and again after every
    /// change to the matching set.
    Snapshot(Vec<ShoppingList>),

    /// The subscription terminated and will deliver nothing further.
    Lost(String),
}

/// Callback invoked with subscription events.
pub type EventSink = Arc<dyn Fn(StoreEvent) + Send + Sync>;

/// Handle to an active live query.
///
/// Cancelling is idempotent and stops all further sink invocations; dropping
/// the handle cancels it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop further event deliveries. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether `cancel` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Live document store holding owner-scoped shopping lists.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Register a live query for every list whose owner equals `owner_id`.
    ///
    /// The sink receives the full current matching set immediately and again
    /// after every change to it.
    fn subscribe(&self, owner_id: &str, sink: EventSink) -> Subscription;

    /// Persist a new list, returning the store-assigned id.
    async fn insert(&self, list: &ShoppingList) -> Result<String, StoreError>;
}
