use cart_core::models::ShoppingList;
use serde::{Deserialize, Serialize};

/// Messages a client sends on the live subscription socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Register a live query for every list owned by `owner_id`. The server
    /// answers with a snapshot immediately and after every change.
    Subscribe { owner_id: String },
}

/// Messages the server sends on the live subscription socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The full current matching set, never a delta.
    Snapshot { lists: Vec<ShoppingList> },
    /// The subscription is dead; no further snapshots will follow.
    Error { message: String },
}

/// Reply body of a successful list insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResponse {
    pub id: String,
}
