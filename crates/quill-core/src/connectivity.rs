//! Live connectivity signal

use std::sync::Arc;

use tokio::sync::watch;

/// Push-based connectivity monitor.
///
/// The platform connectivity callback is an external collaborator; it feeds
/// transitions in through [`set_connected`](Self::set_connected). Observers
/// read the current state immediately on subscription and are woken on every
/// transition.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    #[must_use]
    pub fn new(initially_connected: bool) -> Self {
        let (state, _rx) = watch::channel(initially_connected);
        Self {
            state: Arc::new(state),
        }
    }

    /// Record a connectivity transition from the platform callback.
    pub fn set_connected(&self, connected: bool) {
        self.state.send_replace(connected);
    }

    /// Current connectivity state.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Subscribe to the live connectivity signal.
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
