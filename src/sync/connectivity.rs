//! Online/offline signal.
//!
//! The engine consults the current value before every operation; observers
//! subscribe to be told about transitions as they happen.

use std::time::Duration;

use tokio::sync::watch;

/// Timeout of a single reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publishes a new value; returns whether it changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Probes `url` and publishes the result.
    pub async fn refresh(&self, url: &str) -> bool {
        let online = probe(url).await;
        self.set_online(online);
        online
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

/// True when `url` answers at all within [`PROBE_TIMEOUT`].
///
/// Any HTTP status counts as reachable; only transport failures mean offline.
pub async fn probe(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.head(url).send().await {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(url, error = %e, "reachability probe failed");
            false
        }
    }
}
