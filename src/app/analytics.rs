//! Usage analytics: builds event payloads and hands them to a fire-and-forget
//! beacon transport. Loss is an accepted outcome; the only bookkeeping is a
//! warning counter so the log is not flooded.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tracing::{error, warn};

use crate::ports::beacon::BeaconTransport;
use crate::ports::clock::Clock;

pub const ANALYTICS_CATEGORY: &str = "ma";
/// Stop warning about dropped beacons after this many failures.
const MAX_FAILURE_WARNINGS: u32 = 3;

/// Wire shape of one event, mirroring the Telemetry Events collection spec.
#[derive(Debug, Serialize)]
pub struct BeaconPayload {
    /// Milliseconds since the sender was constructed.
    pub timestamp: i64,
    pub category: &'static str,
    pub method: String,
    pub object: String,
    pub value: Option<String>,
    pub extra: Option<BTreeMap<String, String>>,
}

pub struct AnalyticsSender<T: BeaconTransport, C: Clock> {
    enabled: bool,
    endpoint: String,
    transport: Option<T>,
    clock: C,
    started_at_ms: i64,
    failures: AtomicU32,
}

impl<T: BeaconTransport, C: Clock> AnalyticsSender<T, C> {
    /// Build the process-wide sender. Disabled for the whole process when the
    /// user opted out of tracking, or when no transport is available (the
    /// latter logs one error).
    pub async fn new(
        do_not_track: bool,
        endpoint: impl Into<String>,
        transport: Option<T>,
        clock: C,
    ) -> Self {
        let mut enabled = !do_not_track;
        if enabled && transport.is_none() {
            error!("unable to send beacons, analytics disabled");
            enabled = false;
        }
        let started_at_ms = clock.now_epoch_ms().await;
        Self {
            enabled,
            endpoint: endpoint.into(),
            transport,
            clock,
            started_at_ms,
            failures: AtomicU32::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// How many hand-offs have failed so far.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Fire one event. Returns as soon as the transport has taken (or
    /// refused) the payload; there is no acknowledgment and no retry.
    pub async fn send(
        &self,
        method: &str,
        object: &str,
        value: Option<&str>,
        extra: Option<BTreeMap<String, String>>,
    ) {
        if !self.enabled {
            return;
        }
        let Some(transport) = &self.transport else {
            return;
        };
        let payload = BeaconPayload {
            timestamp: self.clock.now_epoch_ms().await - self.started_at_ms,
            category: ANALYTICS_CATEGORY,
            method: method.to_string(),
            object: object.to_string(),
            value: value.map(str::to_string),
            extra,
        };
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(error) => {
                warn!(%error, "beacon payload failed to serialize");
                return;
            }
        };
        if !transport.deliver(&self.endpoint, &body) {
            let warned = self
                .failures
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    (n < MAX_FAILURE_WARNINGS).then_some(n + 1)
                });
            if warned.is_ok() {
                warn!(method, object, "unable to queue beacon, dropping event");
            }
        }
    }
}
