use async_trait::async_trait;
use cart_core::models::ShoppingList;
use cart_core::store::{EventSink, ListStore, StoreError, StoreEvent, Subscription};
use cart_proto::{ClientMessage, InsertResponse, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const INSERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Store client speaking to a remote list server: a WebSocket per live
/// subscription, HTTP for inserts.
///
/// A subscription that dies (connect failure, socket error, server close)
/// emits a single `Lost` event and ends; it is not retried here.
pub struct RemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn subscribe_url(&self) -> String {
        let ws = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{ws}/api/subscribe")
    }

    fn insert_url(&self) -> String {
        format!("{}/api/lists", self.base_url)
    }
}

#[async_trait]
impl ListStore for RemoteStore {
    fn subscribe(&self, owner_id: &str, sink: EventSink) -> Subscription {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(run_subscription(
            self.subscribe_url(),
            owner_id.to_string(),
            sink,
            cancelled.clone(),
            stop_rx,
        ));
        Subscription::new(move || {
            // Flag first: the task checks it before every sink call, so no
            // event is delivered after cancel has returned.
            cancelled.store(true, Ordering::SeqCst);
            let _ = stop_tx.send(());
        })
    }

    async fn insert(&self, list: &ShoppingList) -> Result<String, StoreError> {
        let response = timeout(
            INSERT_TIMEOUT,
            self.client.post(self.insert_url()).json(list).send(),
        )
        .await
        .map_err(|_| StoreError::Unreachable("insert timed out".into()))?
        .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "server answered {}",
                response.status()
            )));
        }
        let body: InsertResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(body.id)
    }
}

async fn run_subscription(
    url: String,
    owner_id: String,
    sink: EventSink,
    cancelled: Arc<AtomicBool>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let deliver = |event: StoreEvent| {
        if !cancelled.load(Ordering::SeqCst) {
            sink(event);
        }
    };

    let (ws, _) = match connect_async(&url).await {
        Ok(ok) => ok,
        Err(e) => {
            deliver(StoreEvent::Lost(format!("connect failed: {e}")));
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    let subscribe = ClientMessage::Subscribe { owner_id };
    let payload = match serde_json::to_string(&subscribe) {
        Ok(payload) => payload,
        Err(e) => {
            deliver(StoreEvent::Lost(format!("encode failed: {e}")));
            return;
        }
    };
    if let Err(e) = write.send(Message::Text(payload)).await {
        deliver(StoreEvent::Lost(format!("subscribe failed: {e}")));
        return;
    }
    tracing::debug!(%url, "live subscription connected");

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::Snapshot { lists }) => deliver(StoreEvent::Snapshot(lists)),
                    Ok(ServerMessage::Error { message }) => {
                        deliver(StoreEvent::Lost(message));
                        break;
                    }
                    Err(e) => tracing::debug!("ignoring unparseable server message: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    deliver(StoreEvent::Lost("server closed the subscription".into()));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    deliver(StoreEvent::Lost(format!("socket error: {e}")));
                    break;
                }
            }
        }
    }

    let _ = write.close().await;
}
