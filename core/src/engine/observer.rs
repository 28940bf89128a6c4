use std::sync::Arc;

use recce_common::event::Event;
use tracing::{debug, info};

/// Side channel for presentation layers.
///
/// The dispatch loop calls [`Observer::on_event`] synchronously for every event
/// before any rule is evaluated, so implementations must not block.
pub trait Observer: Send + Sync {
    fn on_event(&self, _event: &Event) {}

    fn on_log(&self, _message: &str) {}

    /// `completed` probes out of `total` across every scanned target.
    fn on_progress(&self, _completed: u64, _total: u64) {}
}

/// Default observer: forwards everything to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event) {
        debug!(kind = %event.kind, target = %event.target, payload = %event.payload, "event received");
    }

    fn on_log(&self, message: &str) {
        info!("{message}");
    }
}

/// Broadcasts to several observers in registration order.
#[derive(Default)]
pub struct Fanout {
    observers: Vec<Arc<dyn Observer>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Observer for Fanout {
    fn on_event(&self, event: &Event) {
        self.observers.iter().for_each(|o| o.on_event(event));
    }

    fn on_log(&self, message: &str) {
        self.observers.iter().for_each(|o| o.on_log(message));
    }

    fn on_progress(&self, completed: u64, total: u64) {
        self.observers.iter().for_each(|o| o.on_progress(completed, total));
    }
}
