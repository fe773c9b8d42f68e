use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use telechart::app::analytics::AnalyticsSender;
use telechart::ports::beacon::BeaconTransport;
use telechart::ports::clock::Clock;

const ENDPOINT: &str = "https://telemetry.example/generic/";

#[derive(Clone, Default)]
struct RecordingTransport {
    accept: bool,
    sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl BeaconTransport for RecordingTransport {
    fn deliver(&self, url: &str, payload: &[u8]) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.to_vec()));
        self.accept
    }
}

struct StepClock(Arc<AtomicI64>);

#[async_trait::async_trait]
impl Clock for StepClock {
    async fn now_epoch_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn clock_at(ms: i64) -> (StepClock, Arc<AtomicI64>) {
    let now = Arc::new(AtomicI64::new(ms));
    (StepClock(now.clone()), now)
}

#[tokio::test]
async fn payload_carries_relative_timestamp_and_fixed_category() {
    let transport = RecordingTransport {
        accept: true,
        ..RecordingTransport::default()
    };
    let sent = transport.sent.clone();
    let (clock, now) = clock_at(5_000);
    let sender = AnalyticsSender::new(false, ENDPOINT, Some(transport), clock).await;

    now.store(5_250, Ordering::SeqCst);
    let extra: BTreeMap<String, String> =
        [("pane".to_string(), "main".to_string())].into_iter().collect();
    sender
        .send("click", "button", Some("ok"), Some(extra))
        .await;

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ENDPOINT);
    let payload: serde_json::Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert_eq!(payload["timestamp"], 250);
    assert_eq!(payload["category"], "ma");
    assert_eq!(payload["method"], "click");
    assert_eq!(payload["object"], "button");
    assert_eq!(payload["value"], "ok");
    assert_eq!(payload["extra"]["pane"], "main");
}

#[tokio::test]
async fn opted_out_sender_is_a_no_op() {
    let transport = RecordingTransport {
        accept: true,
        ..RecordingTransport::default()
    };
    let sent = transport.sent.clone();
    let (clock, _) = clock_at(0);
    let sender = AnalyticsSender::new(true, ENDPOINT, Some(transport), clock).await;

    assert!(!sender.enabled());
    sender.send("click", "button", None, None).await;
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_transport_disables_analytics() {
    let (clock, _) = clock_at(0);
    let sender: AnalyticsSender<RecordingTransport, _> =
        AnalyticsSender::new(false, ENDPOINT, None, clock).await;
    assert!(!sender.enabled());
    sender.send("click", "button", None, None).await;
    assert_eq!(sender.failures(), 0);
}

#[tokio::test]
async fn failure_warnings_cap_at_three() {
    let transport = RecordingTransport::default(); // accept: false
    let sent = transport.sent.clone();
    let (clock, _) = clock_at(0);
    let sender = AnalyticsSender::new(false, ENDPOINT, Some(transport), clock).await;

    for _ in 0..5 {
        sender.send("click", "button", None, None).await;
    }
    // Every event was attempted and dropped, but the warning counter stops
    // moving after the third failure.
    assert_eq!(sent.lock().unwrap().len(), 5);
    assert_eq!(sender.failures(), 3);
}

#[tokio::test]
async fn null_value_and_extra_serialize_as_null() {
    let transport = RecordingTransport {
        accept: true,
        ..RecordingTransport::default()
    };
    let sent = transport.sent.clone();
    let (clock, _) = clock_at(0);
    let sender = AnalyticsSender::new(false, ENDPOINT, Some(transport), clock).await;

    sender.send("load", "page", None, None).await;
    let sent = sent.lock().unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert!(payload["value"].is_null());
    assert!(payload["extra"].is_null());
}
