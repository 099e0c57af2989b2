//! Host lifecycle notifications.
//!
//! The hook only needs one capability from the host: run a zero-argument
//! handler once the engine has stopped. [`EngineSignals`] is a minimal host
//! side for binaries and tests.

use std::fmt;

use tracing::debug;

/// Handler invoked when the engine stops.
pub type StopHandler = Box<dyn FnOnce() + Send + 'static>;

/// Registration side of the host's event system.
pub trait LifecycleNotifier {
    /// Subscribe `handler` to the engine-stopped notification.
    fn on_engine_stopped(&mut self, handler: StopHandler);
}

/// Single-shot engine-stopped dispatcher.
#[derive(Default)]
pub struct EngineSignals {
    stopped: Vec<StopHandler>,
}

impl EngineSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers still waiting for the engine to stop.
    pub fn pending(&self) -> usize {
        self.stopped.len()
    }

    /// Notify subscribers in registration order.
    ///
    /// Handlers are consumed, so a second call runs nothing. Returns how many
    /// handlers ran.
    pub fn engine_stopped(&mut self) -> usize {
        let handlers = std::mem::take(&mut self.stopped);
        let count = handlers.len();
        debug!(count, "engine stopped");
        for handler in handlers {
            handler();
        }
        count
    }
}

impl LifecycleNotifier for EngineSignals {
    fn on_engine_stopped(&mut self, handler: StopHandler) {
        self.stopped.push(handler);
    }
}

impl fmt::Debug for EngineSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSignals")
            .field("pending", &self.pending())
            .finish()
    }
}
