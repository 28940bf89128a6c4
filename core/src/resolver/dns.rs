use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use tracing::trace;

/// Forward DNS lookup used to decide whether a hostname is alive.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// `true` when `host` resolves to at least one address. Any failure,
    /// timeouts included, means not alive.
    async fn resolves(&self, host: &str) -> bool;
}

pub struct SystemResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
            timeout,
        }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolves(&self, host: &str) -> bool {
        // Fully qualified so the search domain list is never appended.
        let fqdn = format!("{}.", host.trim_end_matches('.'));
        match tokio::time::timeout(self.timeout, self.resolver.lookup_ip(fqdn)).await {
            Ok(Ok(lookup)) => lookup.iter().next().is_some(),
            Ok(Err(e)) => {
                trace!(host, error = %e, "lookup failed");
                false
            }
            Err(_) => {
                trace!(host, "lookup timed out");
                false
            }
        }
    }
}
