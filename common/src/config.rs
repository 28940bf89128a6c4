use std::time::Duration;

use crate::network::ports::WEB_PORTS;
use crate::network::target::TargetSelection;

pub const DEFAULT_USER_AGENT: &str = concat!("recce/", env!("CARGO_PKG_VERSION"));

/// Runtime settings for one reconnaissance run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Output verbosity: `0` is full output, higher values print less.
    pub quiet: u8,
    /// Deep scan every live subdomain regardless of `selection`.
    pub deep: bool,
    pub selection: TargetSelection,
    /// Explicit port list overriding the quick/deep universes.
    pub ports: Option<Vec<u16>>,
    /// Skip passive sources and go straight to brute force.
    pub no_passive: bool,
    /// Process-wide cap on in-flight port probes.
    pub global_concurrency: usize,
    /// Buffered slots on the event bus.
    pub bus_capacity: usize,
    /// Open ports that trigger HTTP analysis.
    pub web_ports: Vec<u16>,
    pub scan: ScanConfig,
    pub http: HttpConfig,
    pub dns: DnsConfig,
    pub sources: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet: 0,
            deep: false,
            selection: TargetSelection::QuickAll,
            ports: None,
            no_passive: false,
            global_concurrency: 1000,
            bus_capacity: 1000,
            web_ports: WEB_PORTS.to_vec(),
            scan: ScanConfig::default(),
            http: HttpConfig::default(),
            dns: DnsConfig::default(),
            sources: SourceConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub probe_timeout: Duration,
    /// Completed probes per progress notification.
    pub progress_batch: usize,
    /// Deep scans pause for `pacing_delay` after this many launched probes.
    pub pacing_every: usize,
    pub pacing_delay: Duration,
    /// Recommended ceiling for a quick scan of a single target.
    pub quick_concurrency: usize,
    /// Recommended ceiling for a deep scan of a single target.
    pub deep_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(1),
            progress_batch: 50,
            pacing_every: 100,
            pacing_delay: Duration::from_millis(10),
            quick_concurrency: 100,
            deep_concurrency: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub analyze_timeout: Duration,
    pub hunt_timeout: Duration,
    /// Bytes of the response body read for fingerprinting.
    pub body_limit: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            analyze_timeout: Duration::from_secs(5),
            hunt_timeout: Duration::from_secs(3),
            body_limit: 4096,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsConfig {
    pub timeout: Duration,
    pub validate_concurrency: usize,
    /// Kept below `validate_concurrency` so upstream resolvers do not throttle us.
    pub brute_concurrency: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            validate_concurrency: 50,
            brute_concurrency: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Host search endpoint answering `hostname,ip` CSV lines.
    pub hackertarget_url: String,
    /// Certificate transparency search endpoint answering JSON.
    pub crtsh_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            hackertarget_url: "https://api.hackertarget.com/hostsearch/".to_string(),
            crtsh_url: "https://crt.sh/".to_string(),
            request_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry schedule for passive sources.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay after a network error or a malformed body.
    pub retry_delay: Duration,
    /// Delay after a rate-limit or overload status.
    pub throttle_delay: Duration,
    /// Upper bound of the random delay added to every wait.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            throttle_delay: Duration::from_secs(5),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_delay: Duration::ZERO,
            throttle_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }
}
