//! Connectivity signal.
//!
//! A process-wide online/offline flag with edge notifications, consumed by
//! the request executor (immediate queue-or-execute decisions) and the
//! offline queue and health monitor (transition-triggered work). The flag
//! is fed by whatever connectivity detection the embedding application has:
//! platform network callbacks, the health monitor, or operator toggles.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared online/offline flag with subscription support.
///
/// Cloning is cheap and all clones observe the same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a monitor that starts online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Returns the current flag.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Marks the connection as restored. Subscribers are only notified on
    /// an actual offline-to-online edge.
    pub fn set_online(&self) {
        self.sender.send_if_modified(|online| {
            if *online {
                false
            } else {
                *online = true;
                true
            }
        });
    }

    /// Marks the connection as lost.
    pub fn set_offline(&self) {
        self.sender.send_if_modified(|online| {
            if *online {
                *online = false;
                true
            } else {
                false
            }
        });
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::online()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(ConnectivityMonitor::online().is_online());
        assert!(!ConnectivityMonitor::new(false).is_online());
    }

    #[test]
    fn test_transitions_are_shared_across_clones() {
        let monitor = ConnectivityMonitor::online();
        let clone = monitor.clone();

        monitor.set_offline();
        assert!(!clone.is_online());

        clone.set_online();
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscriber_sees_edge() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor.set_online();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_no_notification_without_edge() {
        let monitor = ConnectivityMonitor::online();
        let mut rx = monitor.subscribe();

        // Already online: setting online again is not a transition.
        monitor.set_online();
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), rx.changed())
                .await
                .is_err()
        );
    }
}
