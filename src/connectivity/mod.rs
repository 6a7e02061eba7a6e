//! Online/offline signal.
//!
//! Delivery only runs while the device is online and is triggered by the
//! offline → online transition. The signal is a trait so the delivery side
//! can be driven by a probe in production and flipped by hand in tests or
//! through the API.

mod probe;

pub use probe::{HttpProbe, ProbeMonitor, ReachabilityProbe};

use tokio::sync::watch;

use crate::metrics::CONNECTIVITY_ONLINE;

/// Connectivity as observed by subscribers.
///
/// `online_edges` counts offline → online transitions. A watch channel only
/// keeps its newest value, so a subscriber that wakes after a quick
/// offline/online flicker still sees the edge through the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityStatus {
    pub online: bool,
    pub online_edges: u64,
}

/// Current connectivity plus a subscription to its transitions.
pub trait ConnectivitySignal: Send + Sync {
    /// Whether the device is online right now
    fn is_online(&self) -> bool;

    /// Receiver observing every change of the status
    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus>;
}

/// Watch-channel backed connectivity flag.
///
/// Subscribers are only woken when the value actually changes, so a
/// repeated `set_online(true)` is not mistaken for a became-online edge.
#[derive(Debug)]
pub struct ConnectivityState {
    tx: watch::Sender<ConnectivityStatus>,
}

impl ConnectivityState {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(ConnectivityStatus {
            online: initially_online,
            online_edges: 0,
        });
        CONNECTIVITY_ONLINE.set(i64::from(initially_online));
        Self { tx }
    }

    /// Update the flag. Returns true if this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|status| {
            if status.online == online {
                return false;
            }
            status.online = online;
            if online {
                status.online_edges += 1;
            }
            true
        });

        if changed {
            CONNECTIVITY_ONLINE.set(i64::from(online));
            if online {
                tracing::info!("Connectivity restored");
            } else {
                tracing::warn!("Connectivity lost");
            }
        }
        changed
    }

    /// Number of offline → online transitions so far
    pub fn online_edges(&self) -> u64 {
        self.tx.borrow().online_edges
    }
}

impl ConnectivitySignal for ConnectivityState {
    fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.tx.subscribe()
    }
}
