use crate::cache::ListCache;
use crate::connectivity::ConnectivityState;
use crate::models::{ListCollection, ShoppingList};
use crate::store::{EventSink, ListStore, StoreError, StoreEvent, Subscription};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

/// Where the displayed collection currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    /// Mounted but not yet attached to a data source.
    Idle,
    /// Live subscription active; snapshots are mirrored into the cache.
    Live,
    /// Subscription torn down, serving the last cached snapshot.
    CacheOnly,
    /// Unmounted; the subscription is cancelled and events are ignored.
    Disposed,
}

/// User-facing notifications surfaced by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A list was persisted remotely.
    ListAdded { name: String },
    /// The insert was not attempted: name or items missing.
    InvalidList,
    /// The remote write failed; the collection is unchanged.
    InsertFailed { reason: String },
    /// The live subscription died; now serving cached data.
    SyncLost { reason: String },
}

/// Insert request fed to [`SyncController::run`].
#[derive(Debug, Clone)]
pub struct InsertCommand {
    pub name: String,
    pub items: Vec<String>,
}

/// Internal controller events: store callbacks forwarded off their
/// originating task, and completions of spawned insert attempts.
#[derive(Debug)]
pub enum ControllerEvent {
    Store {
        /// Subscription generation the event originated from. Events from a
        /// cancelled subscription carry a stale generation and are dropped.
        generation: u64,
        event: StoreEvent,
    },
    InsertDone {
        list: ShoppingList,
        result: Result<String, StoreError>,
    },
}

/// Owns the live-subscription lifecycle for one mounted list screen.
///
/// Switches between `Live` and `CacheOnly` on connectivity transitions,
/// mirrors every live snapshot into the local cache, and publishes the
/// current collection on a watch channel for the presentation layer. Holds
/// at most one subscription handle at any time; every re-entry into `Live`
/// cancels the previous handle before opening the next one.
pub struct SyncController<S: ListStore + ?Sized> {
    owner_id: String,
    store: Arc<S>,
    cache: Arc<ListCache>,
    mode: ControllerMode,
    subscription: Option<Subscription>,
    generation: u64,
    lists_tx: watch::Sender<ListCollection>,
    lists_rx: watch::Receiver<ListCollection>,
    notices_tx: UnboundedSender<Notice>,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: Option<UnboundedReceiver<ControllerEvent>>,
}

impl<S: ListStore + ?Sized + 'static> SyncController<S> {
    /// Create an idle controller for the given owner. The returned receiver
    /// carries user-facing notices (the add-confirmation and failure alerts).
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<S>,
        cache: Arc<ListCache>,
    ) -> (Self, UnboundedReceiver<Notice>) {
        let (lists_tx, lists_rx) = watch::channel(ListCollection::new());
        let (notices_tx, notices_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();
        let controller = Self {
            owner_id: owner_id.into(),
            store,
            cache,
            mode: ControllerMode::Idle,
            subscription: None,
            generation: 0,
            lists_tx,
            lists_rx,
            notices_tx,
            events_tx,
            events_rx: Some(events_rx),
        };
        (controller, notices_rx)
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Receiver for the published collection; the presentation layer renders
    /// from this.
    pub fn lists(&self) -> watch::Receiver<ListCollection> {
        self.lists_rx.clone()
    }

    /// The currently published collection.
    pub fn current(&self) -> ListCollection {
        self.lists_rx.borrow().clone()
    }

    /// Attach to a data source using the connectivity known at screen entry.
    pub fn mount(&mut self, connectivity: ConnectivityState) {
        if self.mode != ControllerMode::Idle {
            return;
        }
        match connectivity {
            ConnectivityState::Disconnected => self.enter_cache_only(),
            ConnectivityState::Connected | ConnectivityState::Unknown => self.go_live(),
        }
    }

    /// React to a connectivity transition. This and `mount` are the only
    /// triggers that re-evaluate the Live/CacheOnly decision.
    pub fn handle_connectivity(&mut self, state: ConnectivityState) {
        if self.mode == ControllerMode::Disposed {
            return;
        }
        match state {
            ConnectivityState::Disconnected => {
                if self.mode != ControllerMode::CacheOnly {
                    self.enter_cache_only();
                }
            }
            ConnectivityState::Connected | ConnectivityState::Unknown => self.go_live(),
        }
    }

    /// Unmount: cancel any active subscription unconditionally and ignore
    /// everything that arrives afterwards.
    pub fn dispose(&mut self) {
        self.drop_subscription();
        self.mode = ControllerMode::Disposed;
        tracing::debug!("controller disposed");
    }

    /// Attempt to persist a new list owned by this controller's user.
    ///
    /// Validation is shallow: the name must be non-empty and there must be
    /// items; blank item strings are accepted. The remote write runs on its
    /// own task so callers are never blocked; the outcome arrives as a
    /// [`ControllerEvent::InsertDone`] and is surfaced as a notice. On
    /// success the list is prepended optimistically without the assigned id;
    /// the next live snapshot carries the persisted form (until then the
    /// same list can briefly appear twice).
    pub fn insert(&mut self, name: impl Into<String>, items: Vec<String>) {
        if self.mode == ControllerMode::Disposed {
            return;
        }
        let list = ShoppingList::new(self.owner_id.clone(), name, items);
        if !list.is_insertable() {
            self.notify(Notice::InvalidList);
            return;
        }
        let store = self.store.clone();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = store.insert(&list).await;
            let _ = events_tx.send(ControllerEvent::InsertDone { list, result });
        });
    }

    /// Apply one controller event.
    pub fn apply(&mut self, event: ControllerEvent) {
        if self.mode == ControllerMode::Disposed {
            return;
        }
        match event {
            ControllerEvent::Store { generation, event } => {
                if generation != self.generation {
                    tracing::debug!(generation, "dropping event from cancelled subscription");
                    return;
                }
                match event {
                    StoreEvent::Snapshot(lists) => {
                        if self.mode != ControllerMode::Live {
                            return;
                        }
                        self.cache.write(&lists);
                        self.publish(lists);
                    }
                    StoreEvent::Lost(reason) => {
                        tracing::warn!(%reason, "live subscription lost, serving cache");
                        self.notify(Notice::SyncLost { reason });
                        self.enter_cache_only();
                    }
                }
            }
            ControllerEvent::InsertDone { list, result } => match result {
                Ok(id) => {
                    tracing::debug!(%id, name = %list.name, "list persisted");
                    let name = list.name.clone();
                    self.lists_tx.send_modify(|lists| lists.insert(0, list));
                    self.notify(Notice::ListAdded { name });
                }
                Err(e) => {
                    self.notify(Notice::InsertFailed {
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    /// Apply every event queued so far. Lets tests (and callers that drive
    /// the controller by hand) advance it deterministically.
    pub fn pump(&mut self) {
        let mut pending = Vec::new();
        if let Some(rx) = self.events_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        for event in pending {
            self.apply(event);
        }
    }

    /// Drive the controller until the command channel closes or the
    /// controller is disposed.
    pub async fn run(
        &mut self,
        mut connectivity: watch::Receiver<ConnectivityState>,
        mut commands: UnboundedReceiver<InsertCommand>,
    ) {
        let Some(mut events) = self.events_rx.take() else {
            return;
        };
        self.mount(*connectivity.borrow_and_update());

        loop {
            tokio::select! {
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *connectivity.borrow_and_update();
                    self.handle_connectivity(state);
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.apply(event),
                        None => break,
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => self.insert(command.name, command.items),
                        None => break,
                    }
                }
            }
            if self.mode == ControllerMode::Disposed {
                break;
            }
        }

        self.events_rx = Some(events);
    }

    fn go_live(&mut self) {
        // At most one active subscription per mounted controller: cancel the
        // previous handle before opening the next one.
        self.drop_subscription();
        self.generation += 1;
        let generation = self.generation;
        let events_tx = self.events_tx.clone();
        let sink: EventSink = Arc::new(move |event| {
            let _ = events_tx.send(ControllerEvent::Store { generation, event });
        });
        self.subscription = Some(self.store.subscribe(&self.owner_id, sink));
        self.mode = ControllerMode::Live;
        tracing::debug!(generation, owner = %self.owner_id, "live subscription opened");
    }

    fn enter_cache_only(&mut self) {
        self.drop_subscription();
        self.mode = ControllerMode::CacheOnly;
        let cached = self.cache.read();
        self.publish(cached);
    }

    fn drop_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            // Anything still queued from that subscription is stale now.
            self.generation += 1;
            tracing::debug!(generation = self.generation, "subscription cancelled");
        }
    }

    fn publish(&self, lists: ListCollection) {
        let _ = self.lists_tx.send(lists);
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices_tx.send(notice);
    }
}

impl<S: ListStore + ?Sized> Drop for SyncController<S> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
