use std::time::Duration;
use tokio::sync::watch;

/// Reachability of the remote store as observed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected,
    /// Not yet determined at startup.
    Unknown,
}

/// Continuous connectivity signal.
///
/// Consumers subscribe for a watch receiver and are woken on every
/// transition; no polling required.
pub struct ConnectivityMonitor {
    rx: watch::Receiver<ConnectivityState>,
}

/// Hand-driven feed for a monitor (tests and app-level overrides).
#[derive(Clone)]
pub struct ConnectivitySwitch {
    tx: watch::Sender<ConnectivityState>,
}

impl ConnectivitySwitch {
    /// Report a new state. Repeating the current state is a no-op so
    /// consumers only wake on actual transitions.
    pub fn set(&self, state: ConnectivityState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl ConnectivityMonitor {
    /// A monitor driven by hand through the returned switch. Starts at
    /// `Unknown`.
    pub fn switched() -> (ConnectivitySwitch, Self) {
        let (tx, rx) = watch::channel(ConnectivityState::Unknown);
        (ConnectivitySwitch { tx }, Self { rx })
    }

    /// Spawn a background probe that checks the store's health endpoint on an
    /// interval. Until the first probe completes the signal stays `Unknown`.
    pub fn probe(health_url: String, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(ConnectivityState::Unknown);
        tokio::spawn(run_probe(health_url, interval, tx));
        Self { rx }
    }

    /// Current state without waiting for a transition.
    pub fn current(&self) -> ConnectivityState {
        *self.rx.borrow()
    }

    /// A receiver delivering every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.rx.clone()
    }
}

async fn run_probe(
    health_url: String,
    interval: Duration,
    tx: watch::Sender<ConnectivityState>,
) {
    let client = reqwest::Client::new();
    loop {
        let state = match tokio::time::timeout(
            Duration::from_secs(5),
            client.get(&health_url).send(),
        )
        .await
        {
            Ok(Ok(resp)) if resp.status().is_success() => ConnectivityState::Connected,
            Ok(_) | Err(_) => ConnectivityState::Disconnected,
        };

        if tx.is_closed() {
            break;
        }
        let changed = tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            tracing::debug!(?state, "connectivity changed");
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_unknown() {
        let (_switch, monitor) = ConnectivityMonitor::switched();
        assert_eq!(monitor.current(), ConnectivityState::Unknown);
    }

    #[tokio::test]
    async fn delivers_transitions_to_subscribers() {
        let (switch, monitor) = ConnectivityMonitor::switched();
        let mut rx = monitor.subscribe();

        switch.set(ConnectivityState::Connected);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectivityState::Connected);

        switch.set(ConnectivityState::Disconnected);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectivityState::Disconnected);
    }

    #[tokio::test]
    async fn repeated_state_does_not_wake_consumers() {
        let (switch, monitor) = ConnectivityMonitor::switched();
        let mut rx = monitor.subscribe();

        switch.set(ConnectivityState::Connected);
        rx.changed().await.unwrap();

        switch.set(ConnectivityState::Connected);
        assert!(!rx.has_changed().unwrap());
    }
}
