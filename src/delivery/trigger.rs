use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::connectivity::ConnectivitySignal;

use super::processor::DeliveryProcessor;

/// Background task turning connectivity transitions into drain requests.
///
/// A pass is requested once at startup when already online, and after
/// every offline → online edge once the stabilization delay has elapsed.
/// The processor re-checks connectivity when the delay is up, so a link
/// that drops again during the delay gets no pass.
pub struct DrainTrigger {
    processor: Arc<DeliveryProcessor>,
    connectivity: Arc<dyn ConnectivitySignal>,
    stabilization_delay: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl DrainTrigger {
    pub fn new(
        processor: Arc<DeliveryProcessor>,
        connectivity: Arc<dyn ConnectivitySignal>,
        stabilization_delay: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            processor,
            connectivity,
            stabilization_delay,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut rx = self.connectivity.subscribe();
        let initial = *rx.borrow_and_update();
        let mut seen_edges = initial.online_edges;

        tracing::info!(
            stabilization_delay_ms = self.stabilization_delay.as_millis() as u64,
            online = initial.online,
            "Drain trigger started"
        );

        if initial.online {
            self.schedule(Duration::ZERO);
        }

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Drain trigger received shutdown signal");
                    break;
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = *rx.borrow_and_update();
                    // Several edges between wakeups still get one pass
                    if status.online_edges > seen_edges {
                        seen_edges = status.online_edges;
                        tracing::debug!("Became online, scheduling queue drain");
                        self.schedule(self.stabilization_delay);
                    }
                }
            }
        }

        tracing::info!("Drain trigger stopped");
    }

    /// Request a pass after `delay`, unless shutdown comes first
    fn schedule(&self, delay: Duration) {
        let processor = self.processor.clone();
        let mut shutdown = self.shutdown.resubscribe();

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.recv() => {}
                _ = tokio::time::sleep(delay) => {
                    processor.drain().await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::config::QueueConfig;
    use crate::connectivity::ConnectivityState;
    use crate::queue::{QueueKind, QueueManager};
    use crate::store::MemoryStore;
    use crate::transport::{Transport, TransportError};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn post_json(&self, _endpoint: &str, _body: &Value) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        state: Arc<ConnectivityState>,
        transport: Arc<CountingTransport>,
        queue: Arc<QueueManager>,
        shutdown: broadcast::Sender<()>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(initially_online: bool) -> Harness {
        let config = QueueConfig {
            persist_debounce_ms: 0,
            ..QueueConfig::default()
        };
        let queue = Arc::new(QueueManager::load(Arc::new(MemoryStore::new()), &config));
        queue.enqueue(
            QueueKind::SalesforceExport,
            json!({"webhookUrl": "https://hook", "payload": {}}),
        );

        let state = Arc::new(ConnectivityState::new(initially_online));
        let transport = Arc::new(CountingTransport::default());
        let processor = Arc::new(DeliveryProcessor::new(
            queue.clone(),
            transport.clone(),
            state.clone(),
        ));
        let (shutdown, rx) = broadcast::channel(1);
        let trigger = DrainTrigger::new(processor, state.clone(), Duration::from_secs(1), rx);
        let handle = tokio::spawn(trigger.run());

        Harness {
            state,
            transport,
            queue,
            shutdown,
            handle,
        }
    }

    impl Harness {
        fn calls(&self) -> usize {
            self.transport.calls.load(Ordering::SeqCst)
        }

        async fn stop(self) {
            let _ = self.shutdown.send(());
            self.handle.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_at_startup_when_online() {
        let harness = start(true);

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(harness.calls(), 1);
        assert!(harness.queue.is_empty());
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_stabilization_delay() {
        let harness = start(false);
        tokio::time::sleep(Duration::from_millis(10)).await;

        harness.state.set_online(true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(harness.calls(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(harness.calls(), 1);
        assert!(harness.queue.is_empty());
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flicker_within_delay_skips_pass() {
        let harness = start(false);
        tokio::time::sleep(Duration::from_millis(10)).await;

        harness.state.set_online(true);
        tokio::time::sleep(Duration::from_millis(200)).await;
        harness.state.set_online(false);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(harness.calls(), 0);
        assert_eq!(harness.queue.len(), 1);
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flicker_between_wakeups_still_drains() {
        let harness = start(true);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(harness.calls(), 1);

        // Queued while online, then a drop and recovery before the trigger runs
        harness.queue.enqueue(
            QueueKind::SalesforceExport,
            json!({"webhookUrl": "https://hook", "payload": {}}),
        );
        assert!(harness.state.set_online(false));
        assert!(harness.state.set_online(true));

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(harness.calls(), 2);
        assert!(harness.queue.is_empty());
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_drain_while_staying_offline() {
        let harness = start(false);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(harness.calls(), 0);
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_scheduled_drain() {
        let harness = start(false);
        tokio::time::sleep(Duration::from_millis(10)).await;

        harness.state.set_online(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let state = harness.state.clone();
        let transport = harness.transport.clone();
        harness.stop().await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(state.is_online());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
