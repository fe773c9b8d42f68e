//! Channel-backed `BeaconTransport`: `deliver` pushes onto a bounded queue
//! and reports the hand-off; a detached task drains the queue over HTTP.
//! This is the `navigator.sendBeacon` analogue, loss included.
use tokio::sync::mpsc;
use tracing::debug;

use crate::ports::beacon::BeaconTransport;

pub struct QueuedBeacon {
    tx: mpsc::Sender<(String, Vec<u8>)>,
}

impl QueuedBeacon {
    /// Spawn the drain task on the current runtime and return the sending
    /// half. The queue holds at most `depth` undelivered beacons; beyond
    /// that, `deliver` refuses.
    pub fn spawn(client: reqwest::Client, depth: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<(String, Vec<u8>)>(depth);
        tokio::spawn(async move {
            while let Some((url, payload)) = rx.recv().await {
                match client.post(&url).body(payload).send().await {
                    Ok(response) => debug!(%url, status = %response.status(), "beacon delivered"),
                    // Best-effort only: the event is already gone.
                    Err(error) => debug!(%url, %error, "beacon delivery failed"),
                }
            }
        });
        Self { tx }
    }
}

impl BeaconTransport for QueuedBeacon {
    fn deliver(&self, url: &str, payload: &[u8]) -> bool {
        self.tx.try_send((url.to_string(), payload.to_vec())).is_ok()
    }
}
