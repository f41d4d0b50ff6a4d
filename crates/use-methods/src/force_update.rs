//! Re-render notification for consumers of an engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// The render counter wraps at this value
const RENDER_MODULUS: u64 = 1_000_000_007;

/// Render counter shared by an engine and its loading tracker.
///
/// Every commit bumps the counter once. Consumers subscribe to the watch
/// channel and re-read the state when it changes. After `unmount` the
/// trigger is a no-op.
#[derive(Clone)]
pub struct ForceUpdate {
    tx: Arc<watch::Sender<u64>>,
    mounted: Arc<AtomicBool>,
}

impl ForceUpdate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            tx: Arc::new(tx),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn trigger(&self) {
        if !self.is_mounted() {
            log::debug!("Skipping re-render of an unmounted consumer");
            return;
        }
        self.tx.send_modify(|renders| *renders = (*renders + 1) % RENDER_MODULUS);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Current value of the render counter
    pub fn renders(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Default for ForceUpdate {
    fn default() -> Self {
        Self::new()
    }
}
