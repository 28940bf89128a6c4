//! Passive hostname sources.
//!
//! Each source is one HTTPS endpoint that knows hostnames under a domain
//! without us ever touching the target. Failures are classified so the retry
//! loop can tell a busy upstream from one that will never answer.

use std::time::Duration;

use async_trait::async_trait;
use recce_common::config::RetryPolicy;
use recce_common::network::target::Domain;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("throttled by upstream ({0})")]
    Throttled(StatusCode),
    #[error("rejected by upstream ({0})")]
    Rejected(StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 | 502 | 503 | 504 => SourceError::Throttled(status),
            _ => SourceError::Rejected(status),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, SourceError::Rejected(_))
    }

    /// Base wait before the next attempt, jitter excluded.
    pub fn backoff(&self, policy: &RetryPolicy) -> Duration {
        match self {
            SourceError::Throttled(_) => policy.throttle_delay,
            _ => policy.retry_delay,
        }
    }
}

#[async_trait]
pub trait PassiveSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, domain: &Domain) -> Result<Vec<String>, SourceError>;
}

/// Host search API answering `hostname,ip` lines.
pub struct HackerTarget {
    client: Client,
    url: String,
}

impl HackerTarget {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PassiveSource for HackerTarget {
    fn name(&self) -> &'static str {
        "hackertarget"
    }

    async fn fetch(&self, domain: &Domain) -> Result<Vec<String>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", domain.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status));
        }

        let body = response.text().await?;
        Ok(parse_host_csv(&body))
    }
}

/// Quota and "no records" notices come back as plain text lines without a
/// comma, so they are skipped rather than treated as hosts.
fn parse_host_csv(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.split_once(','))
        .map(|(host, _ip)| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .collect()
}

/// Certificate transparency search.
pub struct CrtSh {
    client: Client,
    url: String,
}

impl CrtSh {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CertificateEntry {
    name_value: String,
}

#[async_trait]
impl PassiveSource for CrtSh {
    fn name(&self) -> &'static str {
        "crt.sh"
    }

    async fn fetch(&self, domain: &Domain) -> Result<Vec<String>, SourceError> {
        let wildcard = format!("%.{domain}");
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", wildcard.as_str()), ("output", "json")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status));
        }

        let body = response.text().await?;
        parse_certificates(&body)
    }
}

fn parse_certificates(body: &str) -> Result<Vec<String>, SourceError> {
    let entries: Vec<CertificateEntry> =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    // One certificate may list several names, newline separated.
    Ok(entries
        .iter()
        .flat_map(|entry| entry.name_value.lines())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect())
}

/// Runs `source` under `policy`. Exhausted or abandoned sources yield nothing.
pub async fn fetch_with_retry(
    source: &dyn PassiveSource,
    domain: &Domain,
    policy: &RetryPolicy,
) -> Vec<String> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match source.fetch(domain).await {
            Ok(hosts) => {
                debug!(source = source.name(), attempt, hosts = hosts.len(), "passive source answered");
                return hosts;
            }
            Err(e) if e.is_retryable() && attempt < attempts => {
                let wait = e.backoff(policy) + jitter(policy.jitter);
                warn!(source = source.name(), attempt, error = %e, ?wait, "passive source failed, retrying");
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                warn!(source = source.name(), attempt, error = %e, "giving up on passive source");
                return Vec::new();
            }
        }
    }

    Vec::new()
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::random_range(0..=max_ms))
}
