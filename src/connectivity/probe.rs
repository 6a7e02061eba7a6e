//! Reachability probing.
//!
//! While online the probe runs on a fixed interval. Once a probe fails the
//! monitor re-checks with a jittered exponential backoff capped at that
//! interval, so recovery is noticed quickly without hammering the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::backoff::{BackoffConfig, ExponentialBackoff};

use super::ConnectivityState;

/// A single reachability check
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Probe that issues a GET and treats any response below 500 as reachable.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Reachability probe failed");
                false
            }
        }
    }
}

/// Background task feeding probe results into a `ConnectivityState`.
pub struct ProbeMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    state: Arc<ConnectivityState>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ProbeMonitor {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        state: Arc<ConnectivityState>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            probe,
            state,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig::capped_at(self.interval));

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Connectivity probe started"
        );

        loop {
            let reachable = self.probe.check().await;
            self.state.set_online(reachable);

            let delay = if reachable {
                backoff.reset();
                self.interval
            } else {
                let delay = backoff.next_delay();
                tracing::debug!(
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Offline, scheduling next reachability check"
                );
                delay
            };

            tokio::select! {
                _ = self.shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Connectivity probe stopped");
    }
}
