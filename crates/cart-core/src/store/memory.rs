use super::{EventSink, ListStore, StoreError, StoreEvent, Subscription};
use crate::models::ShoppingList;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct Subscriber {
    owner_id: String,
    sink: EventSink,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct Shared {
    docs: Vec<ShoppingList>,
    subscribers: HashMap<u64, Subscriber>,
    offline: bool,
    paused: bool,
}

/// In-process list store used by tests and the app's local-only mode.
///
/// Implements the full subscription contract: equality filter on the owner
/// id, an immediate snapshot on registration, and a snapshot to every
/// matching subscriber after each insert. Knobs exist to fail writes
/// (`set_offline`), hold back deliveries (`pause_deliveries` / `flush`) and
/// to observe the number of open subscriptions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
    opened: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent inserts fail with `StoreError::Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        self.shared.lock().unwrap().offline = offline;
    }

    /// Hold back snapshot deliveries until `flush` is called.
    pub fn pause_deliveries(&self) {
        self.shared.lock().unwrap().paused = true;
    }

    /// Resume deliveries and push the current matching set to every
    /// subscriber. Also usable as a "force a snapshot now" knob.
    pub fn flush(&self) {
        let pending = {
            let mut shared = self.shared.lock().unwrap();
            shared.paused = false;
            Self::deliveries(&shared)
        };
        for (sink, snapshot) in pending {
            sink(StoreEvent::Snapshot(snapshot));
        }
    }

    /// Terminate every open subscription with a `Lost` event, as a store
    /// would when a live query dies server-side.
    pub fn break_subscriptions(&self, reason: &str) {
        let sinks: Vec<EventSink> = {
            let mut shared = self.shared.lock().unwrap();
            let sinks = shared
                .subscribers
                .values()
                .filter(|s| !s.cancelled.load(Ordering::SeqCst))
                .map(|s| s.sink.clone())
                .collect();
            shared.subscribers.clear();
            sinks
        };
        for sink in sinks {
            sink(StoreEvent::Lost(reason.to_string()));
        }
    }

    /// Number of currently registered, not-yet-cancelled subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().unwrap().subscribers.len()
    }

    /// Total subscriptions ever opened.
    pub fn subscriptions_opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Lists currently persisted, regardless of owner.
    pub fn documents(&self) -> Vec<ShoppingList> {
        self.shared.lock().unwrap().docs.clone()
    }

    fn matching(docs: &[ShoppingList], owner_id: &str) -> Vec<ShoppingList> {
        docs.iter()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn deliveries(shared: &Shared) -> Vec<(EventSink, Vec<ShoppingList>)> {
        shared
            .subscribers
            .values()
            .filter(|s| !s.cancelled.load(Ordering::SeqCst))
            .map(|s| (s.sink.clone(), Self::matching(&shared.docs, &s.owner_id)))
            .collect()
    }

    // Sinks are invoked with the shared lock released.
    fn notify_all(&self) {
        let pending = {
            let shared = self.shared.lock().unwrap();
            if shared.paused {
                return;
            }
            Self::deliveries(&shared)
        };
        for (sink, snapshot) in pending {
            sink(StoreEvent::Snapshot(snapshot));
        }
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    fn subscribe(&self, owner_id: &str, sink: EventSink) -> Subscription {
        let token = self.opened.fetch_add(1, Ordering::SeqCst);
        let cancelled = Arc::new(AtomicBool::new(false));

        let initial = {
            let mut shared = self.shared.lock().unwrap();
            shared.subscribers.insert(
                token,
                Subscriber {
                    owner_id: owner_id.to_string(),
                    sink: sink.clone(),
                    cancelled: cancelled.clone(),
                },
            );
            if shared.paused {
                None
            } else {
                Some(Self::matching(&shared.docs, owner_id))
            }
        };
        if let Some(snapshot) = initial {
            sink(StoreEvent::Snapshot(snapshot));
        }

        let shared = self.shared.clone();
        Subscription::new(move || {
            cancelled.store(true, Ordering::SeqCst);
            shared.lock().unwrap().subscribers.remove(&token);
        })
    }

    async fn insert(&self, list: &ShoppingList) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut shared = self.shared.lock().unwrap();
            if shared.offline {
                return Err(StoreError::Unreachable("store is offline".into()));
            }
            let mut persisted = list.clone();
            persisted.id = Some(id.clone());
            shared.docs.push(persisted);
        }
        self.notify_all();
        Ok(id)
    }
}
