//! End-to-end tests for the offline export queue
//!
//! These drive the queue, the drain trigger and the HTTP surface together
//! with an in-process transport, so no network is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_test::{assert_ok, assert_pending, assert_ready};
use tower::ServiceExt;

use offline_export_queue::config::{ConnectivityMode, QueueConfig, Settings};
use offline_export_queue::connectivity::ConnectivityState;
use offline_export_queue::delivery::{DeliveryProcessor, DrainOutcome, DrainTrigger};
use offline_export_queue::queue::{decode_queue, QueueKind, QueueManager, DEFAULT_STORAGE_KEY};
use offline_export_queue::server::{create_app, AppState};
use offline_export_queue::store::{FileStore, KeyValueStore, MemoryStore, ScopedStore};
use offline_export_queue::transport::{Transport, TransportError};

/// Records every POST; fails while `failing` is set
#[derive(Default)]
struct FakeTransport {
    failing: std::sync::atomic::AtomicBool,
    calls: Mutex<Vec<(String, Value)>>,
    attempts: AtomicUsize,
}

impl FakeTransport {
    fn failing() -> Self {
        let transport = Self::default();
        transport.failing.store(true, Ordering::SeqCst);
        transport
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));
        if self.failing.load(Ordering::SeqCst) {
            Err(TransportError::Status {
                status: 502,
                body: "flow unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn inline_config() -> QueueConfig {
    QueueConfig {
        persist_debounce_ms: 0,
        ..QueueConfig::default()
    }
}

fn stored_items(store: &dyn KeyValueStore) -> Vec<offline_export_queue::queue::QueueItem> {
    let blob = store
        .get(DEFAULT_STORAGE_KEY)
        .unwrap()
        .expect("queue blob should be stored");
    decode_queue(&blob).unwrap()
}

// ============================================================================
// Drain lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failing_export_is_evicted_after_three_passes() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(QueueManager::load(store.clone(), &inline_config()));
    let connectivity = Arc::new(ConnectivityState::new(false));
    let transport = Arc::new(FakeTransport::failing());
    let processor = Arc::new(DeliveryProcessor::new(
        queue.clone(),
        transport.clone(),
        connectivity.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel(1);
    let trigger = DrainTrigger::new(
        processor.clone(),
        connectivity.clone(),
        Duration::from_secs(1),
        shutdown_tx.subscribe(),
    );
    let trigger_handle = tokio::spawn(trigger.run());

    let id = queue.enqueue(
        QueueKind::SalesforceExport,
        json!({"webhookUrl": "https://x", "payload": {"account_name": "General"}}),
    );
    assert_eq!(queue.len(), 1);
    assert_eq!(stored_items(store.as_ref()).len(), 1);

    for expected in 1..=2u32 {
        connectivity.set_online(true);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(queue.get(&id).unwrap().retry_count, expected);
        assert_eq!(stored_items(store.as_ref())[0].retry_count, expected);
        connectivity.set_online(false);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    connectivity.set_online(true);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(queue.is_empty());
    assert!(stored_items(store.as_ref()).is_empty());
    assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    assert_eq!(transport.attempts(), 3);

    let _ = shutdown_tx.send(());
    trigger_handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_recovered_endpoint_delivers_on_next_pass() {
    let queue = Arc::new(QueueManager::load(
        Arc::new(MemoryStore::new()),
        &inline_config(),
    ));
    let connectivity = Arc::new(ConnectivityState::new(true));
    let transport = Arc::new(FakeTransport::failing());
    let processor = DeliveryProcessor::new(queue.clone(), transport.clone(), connectivity);

    let id = queue.enqueue(
        QueueKind::SalesforceExport,
        json!({"webhookUrl": "https://x", "payload": {"ep_name": "Dr. Lee"}}),
    );

    processor.drain().await;
    assert_eq!(queue.get(&id).unwrap().retry_count, 1);

    transport.failing.store(false, Ordering::SeqCst);
    processor.drain().await;

    assert!(queue.is_empty());
    let calls = transport.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], ("https://x".to_string(), json!({"ep_name": "Dr. Lee"})));
}

#[tokio::test]
async fn test_drain_request_while_offline_is_noop() {
    let queue = Arc::new(QueueManager::load(
        Arc::new(MemoryStore::new()),
        &inline_config(),
    ));
    let transport = Arc::new(FakeTransport::default());
    let processor = DeliveryProcessor::new(
        queue.clone(),
        transport.clone(),
        Arc::new(ConnectivityState::new(false)),
    );
    queue.enqueue(QueueKind::SalesforceExport, json!({"webhookUrl": "https://x", "payload": {}}));

    assert_eq!(processor.drain().await, DrainOutcome::Offline);
    assert_eq!(transport.attempts(), 0);
    assert_eq!(queue.len(), 1);
}

/// Blocks every POST until released
struct GatedTransport {
    gate: tokio::sync::Semaphore,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn post_json(&self, _endpoint: &str, _body: &Value) -> Result<(), TransportError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        permit.forget();
        Ok(())
    }
}

#[test]
fn test_pass_in_flight_blocks_second_pass() {
    let queue = Arc::new(QueueManager::load(
        Arc::new(MemoryStore::new()),
        &inline_config(),
    ));
    queue.enqueue(QueueKind::SalesforceExport, json!({"webhookUrl": "https://x", "payload": {}}));
    let transport = Arc::new(GatedTransport {
        gate: tokio::sync::Semaphore::new(0),
    });
    let processor = DeliveryProcessor::new(
        queue.clone(),
        transport.clone(),
        Arc::new(ConnectivityState::new(true)),
    );

    let mut first = tokio_test::task::spawn(processor.drain());
    assert_pending!(first.poll());
    assert!(processor.is_processing());

    let mut second = tokio_test::task::spawn(processor.drain());
    let outcome = assert_ready!(second.poll());
    assert_eq!(outcome, DrainOutcome::AlreadyDraining);

    transport.gate.add_permits(1);
    assert!(first.is_woken());
    let outcome = assert_ready!(first.poll());
    assert!(matches!(outcome, DrainOutcome::Completed(_)));
    assert!(!processor.is_processing());
    assert!(queue.is_empty());
}

// ============================================================================
// Persistence across restarts
// ============================================================================

#[test]
fn test_queue_survives_restart_on_file_store() {
    let dir = tempfile::tempdir().unwrap();

    let ids = {
        let store: Arc<dyn KeyValueStore> = Arc::new(ScopedStore::new(
            Arc::new(FileStore::open(dir.path()).unwrap()),
            "device_abc",
        ));
        let queue = QueueManager::load(store, &inline_config());
        vec![
            queue.enqueue(QueueKind::SalesforceExport, json!({"webhookUrl": "https://a", "payload": {}})),
            queue.enqueue(QueueKind::SalesforceExport, json!({"webhookUrl": "https://b", "payload": {}})),
        ]
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(ScopedStore::new(
        Arc::new(FileStore::open(dir.path()).unwrap()),
        "device_abc",
    ));
    let queue = QueueManager::load(store, &inline_config());

    let reloaded: Vec<_> = queue.snapshot().into_iter().map(|item| item.id).collect();
    assert_eq!(reloaded, ids);

    // Another device's queue is separate
    let other: Arc<dyn KeyValueStore> = Arc::new(ScopedStore::new(
        Arc::new(FileStore::open(dir.path()).unwrap()),
        "device_xyz",
    ));
    assert!(QueueManager::load(other, &inline_config()).is_empty());
}

#[test]
fn test_legacy_blob_with_type_field_loads() {
    let store = Arc::new(MemoryStore::new());
    assert_ok!(store.set(
        DEFAULT_STORAGE_KEY,
        r#"[{"id":"1712000000000","type":"salesforce_export","data":{"webhookUrl":"https://x","payload":{}},"timestamp":1712000000000,"retryCount":2}]"#,
    ));

    let queue = QueueManager::load(store, &inline_config());

    let item = queue.get("1712000000000").unwrap();
    assert_eq!(item.kind, QueueKind::SalesforceExport);
    assert_eq!(item.retry_count, 2);
    assert_eq!(item.enqueued_at.timestamp_millis(), 1_712_000_000_000);
}

#[test]
fn test_corrupt_blob_starts_empty() {
    let store = Arc::new(MemoryStore::new());
    assert_ok!(store.set(DEFAULT_STORAGE_KEY, "{not json"));

    let queue = QueueManager::load(store, &inline_config());

    assert!(queue.is_empty());
}

// ============================================================================
// HTTP API
// ============================================================================

struct TestApp {
    router: axum::Router,
    queue: Arc<QueueManager>,
    connectivity: Arc<ConnectivityState>,
    transport: Arc<FakeTransport>,
}

fn test_app(online: bool, mode: ConnectivityMode) -> TestApp {
    let mut settings = Settings::default();
    settings.connectivity.mode = mode;

    let queue = Arc::new(QueueManager::load(
        Arc::new(MemoryStore::new()),
        &inline_config(),
    ));
    let connectivity = Arc::new(ConnectivityState::new(online));
    let transport = Arc::new(FakeTransport::default());
    let state = AppState::new(settings, queue.clone(), transport.clone(), connectivity.clone());

    TestApp {
        router: create_app(state),
        queue,
        connectivity,
        transport,
    }
}

async fn call(router: &axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_queue_state() {
    let app = test_app(false, ConnectivityMode::Manual);
    app.queue.enqueue(QueueKind::SalesforceExport, json!({"webhookUrl": "https://x", "payload": {}}));

    let (status, body) = call(&app.router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["online"], false);
    assert_eq!(body["queue"]["length"], 1);
    assert_eq!(body["queue"]["is_processing"], false);
}

#[tokio::test]
async fn test_enqueue_list_and_clear() {
    let app = test_app(false, ConnectivityMode::Manual);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/queue",
        Some(json!({"type": "salesforce_export", "data": {"webhookUrl": "https://x", "payload": {}}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["length"], 1);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app.router, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 1);
    assert_eq!(body["max_retries"], 3);
    assert_eq!(body["items"][0]["id"], id.as_str());
    assert_eq!(body["items"][0]["kind"], "salesforce_export");
    assert_eq!(body["items"][0]["retryCount"], 0);

    let (status, body) = call(&app.router, Method::DELETE, "/api/v1/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
    assert!(app.queue.is_empty());
}

#[tokio::test]
async fn test_enqueue_rejects_non_object_data() {
    let app = test_app(false, ConnectivityMode::Manual);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/queue",
        Some(json!({"kind": "salesforce_export", "data": "text"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(app.queue.is_empty());
}

#[tokio::test]
async fn test_offline_export_is_queued_then_drained() {
    let app = test_app(false, ConnectivityMode::Manual);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/exports",
        Some(json!({
            "webhookUrl": "https://flow",
            "record": {"accountName": "General", "epName": "Dr. Lee", "lesionSets": {"PVI": true}}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");
    assert_eq!(
        body["message"],
        "You're offline. Data queued for export when connection is restored."
    );
    assert_eq!(app.queue.len(), 1);

    let (_, body) = call(&app.router, Method::POST, "/api/v1/queue/drain", None).await;
    assert_eq!(body["outcome"], "offline");

    app.connectivity.set_online(true);
    let (status, body) = call(&app.router, Method::POST, "/api/v1/queue/drain", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["report"]["delivered"], 1);
    assert!(app.queue.is_empty());

    let calls = app.transport.calls.lock().unwrap();
    assert_eq!(calls[0].0, "https://flow");
    assert_eq!(calls[0].1["lesion_sets"], "PVI");
}

#[tokio::test]
async fn test_export_without_webhook_url_is_rejected() {
    let app = test_app(true, ConnectivityMode::Manual);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/api/v1/exports",
        Some(json!({"record": {}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(app.transport.attempts(), 0);
}

#[tokio::test]
async fn test_set_connectivity_in_manual_mode() {
    let app = test_app(false, ConnectivityMode::Manual);

    let (status, body) = call(
        &app.router,
        Method::PUT,
        "/api/v1/connectivity",
        Some(json!({"online": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], true);
    assert_eq!(body["changed"], true);
    assert_eq!(body["mode"], "manual");
}

#[tokio::test]
async fn test_set_connectivity_rejected_in_probe_mode() {
    let app = test_app(false, ConnectivityMode::Probe);

    let (status, _) = call(
        &app.router,
        Method::PUT,
        "/api/v1/connectivity",
        Some(json!({"online": true})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app.router, Method::GET, "/api/v1/connectivity", None).await;
    assert_eq!(body["online"], false);
    assert_eq!(body["mode"], "probe");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app(false, ConnectivityMode::Manual);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("export_queue_length"));
}
