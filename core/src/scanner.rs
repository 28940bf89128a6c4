//! TCP port scanning.
//!
//! [`PortScanner`] fans out one task per port, but a task only exists once it
//! holds a slot from both the per-target ceiling and the process-wide
//! [`ConcurrencyLimiter`]. Slots are released as soon as the probe returns, so
//! publishing to a saturated bus never starves other scans of sockets.
//!
//! Open ports are reported twice: as `PortOpen` events on the bus, and in the
//! sorted list returned to the caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use recce_common::config::ScanConfig;
use recce_common::event::Event;
use recce_common::network::target::ScanTarget;
use recce_common::{Error, success};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::Bus;

mod limiter;
mod prober;

pub use limiter::ConcurrencyLimiter;
pub use prober::{Prober, TcpProber};

/// Receives the number of probes completed since the previous call.
pub type ProgressSink = Arc<dyn Fn(usize) + Send + Sync>;

pub struct PortScanner {
    bus: Bus,
    prober: Arc<dyn Prober>,
    limiter: ConcurrencyLimiter,
    config: ScanConfig,
}

impl PortScanner {
    pub fn new(
        bus: Bus,
        prober: Arc<dyn Prober>,
        limiter: ConcurrencyLimiter,
        config: ScanConfig,
    ) -> Self {
        Self {
            bus,
            prober,
            limiter,
            config,
        }
    }

    /// Ceiling on concurrent probes against a single target.
    pub fn recommended_concurrency(&self, target: &ScanTarget) -> usize {
        let ceiling = if target.is_deep() {
            self.config.deep_concurrency
        } else {
            self.config.quick_concurrency
        };
        ceiling.max(1)
    }

    /// Probes every port of `target` and returns the open ones in ascending order.
    ///
    /// Every probed port is eventually reported to `progress`, in batches of
    /// `progress_batch` followed by one final remainder. A target that does not
    /// resolve counts as fully probed.
    pub async fn scan(&self, target: &ScanTarget, progress: ProgressSink) -> Result<Vec<u16>, Error> {
        let ports = target.ports.ports();
        let total = ports.len();
        let deep = target.is_deep();
        info!(
            target = %target.host,
            ports = total,
            mode = if deep { "deep" } else { "quick" },
            "starting port scan"
        );

        let Some(ip) = self.prober.resolve(&target.host).await else {
            warn!(target = %target.host, "no IPv4 address, skipping port scan");
            if total > 0 {
                progress(total);
            }
            return Ok(Vec::new());
        };

        let local = Arc::new(Semaphore::new(self.recommended_concurrency(target)));
        let completed = Arc::new(AtomicUsize::new(0));
        let batch = self.config.progress_batch.max(1);
        let mut tasks = JoinSet::new();

        for (launched, port) in ports.into_iter().enumerate() {
            if deep
                && self.config.pacing_every > 0
                && launched > 0
                && launched % self.config.pacing_every == 0
            {
                tokio::time::sleep(self.config.pacing_delay).await;
            }

            // Local first, so a target waiting on its own ceiling holds no global slot.
            let local_permit = Arc::clone(&local)
                .acquire_owned()
                .await
                .map_err(|_| Error::LimiterClosed)?;
            let global_permit = self.limiter.acquire().await?;

            let prober = Arc::clone(&self.prober);
            let bus = self.bus.clone();
            let host = target.host.clone();
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);

            tasks.spawn(async move {
                let open = prober.probe(SocketAddr::new(ip, port)).await;
                drop(global_permit);
                drop(local_permit);

                let published = if open {
                    success!(host = %host, port, "open port");
                    bus.publish_detached(Event::port_open(&host, port))
                } else {
                    Ok(())
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % batch == 0 {
                    progress(batch);
                }
                published.map(|()| open.then_some(port))
            });
        }

        let mut open_ports = Vec::new();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(port))) => open_ports.push(port),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => error!(target = %target.host, error = %e, "probe task failed"),
            }
        }

        let remainder = completed.load(Ordering::SeqCst) % batch;
        if remainder > 0 {
            progress(remainder);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        open_ports.sort_unstable();
        debug!(target = %target.host, open = ?open_ports, "port scan complete");
        info!(target = %target.host, open = open_ports.len(), "finished port scan");
        Ok(open_ports)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
