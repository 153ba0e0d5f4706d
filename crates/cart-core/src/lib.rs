pub mod cache;
pub mod config;
pub mod connectivity;
pub mod identity;
pub mod models;
pub mod store;
pub mod sync;

// Re-export commonly used types and functions
pub use cache::ListCache;
pub use config::Config;
pub use connectivity::{ConnectivityMonitor, ConnectivityState, ConnectivitySwitch};
pub use models::{ListCollection, ShoppingList};
pub use store::{ListStore, MemoryStore, StoreError, StoreEvent, Subscription};
pub use sync::{ControllerMode, InsertCommand, Notice, SyncController};
