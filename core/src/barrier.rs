//! Completion barriers for the pipeline's waves of asynchronous work.
//!
//! A [`Barrier`] counts outstanding units of work. Work enters by taking a
//! [`WaveGuard`] and exits when the guard is dropped, which also happens when the
//! task holding it panics. A wave is complete exactly when the count is zero.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Barrier {
    name: &'static str,
    count: Arc<watch::Sender<usize>>,
}

impl Barrier {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            name,
            count: Arc::new(tx),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers one unit of work.
    ///
    /// Must be called before the work is handed to another task, otherwise a
    /// waiter can observe zero in between.
    pub fn enter(&self) -> WaveGuard {
        self.count.send_modify(|count| *count += 1);
        WaveGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn pending(&self) -> usize {
        *self.count.borrow()
    }

    /// Resolves once no work is outstanding.
    pub async fn await_zero(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

/// Proof of one outstanding unit of work. Dropping it exits the barrier.
#[derive(Debug)]
#[must_use = "dropping the guard immediately exits the barrier"]
pub struct WaveGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for WaveGuard {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count -= 1);
    }
}
