//! HTTP service fingerprinting.

use std::time::Duration;

use once_cell::sync::Lazy;
use recce_common::config::HttpConfig;
use recce_common::event::{Event, HttpService};
use recce_common::network::ports::is_tls_port;
use recce_common::{Error, success};
use regex::Regex;
use reqwest::header::{HeaderMap, SERVER};
use reqwest::{Client, Response, redirect};
use tracing::{debug, info};

use crate::engine::Bus;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid")
});

pub fn base_url(target: &str, port: u16) -> String {
    let scheme = if is_tls_port(port) { "https" } else { "http" };
    format!("{scheme}://{target}:{port}")
}

/// Builds the shared client. `insecure` disables certificate validation and
/// is only meant for fingerprinting, never for trust decisions.
pub fn build_client(config: &HttpConfig, timeout: Duration, insecure: bool) -> Result<Client, Error> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(config.user_agent.as_str());
    if insecure {
        builder = builder.danger_accept_invalid_certs(true);
    } else {
        // A redirect to a login page would read as a 200 for the probed path.
        builder = builder.redirect(redirect::Policy::none());
    }
    builder.build().map_err(|e| Error::HttpClient(e.to_string()))
}

/// What the analyzer learned about one web service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPage {
    pub url: String,
    pub status: u16,
    pub title: String,
    pub service: HttpService,
}

pub struct HttpAnalyzer {
    bus: Bus,
    client: Client,
    body_limit: usize,
}

impl HttpAnalyzer {
    pub fn new(bus: Bus, config: &HttpConfig) -> Result<Self, Error> {
        let client = build_client(config, config.analyze_timeout, true)?;
        Ok(Self::with_client(bus, client, config.body_limit))
    }

    pub fn with_client(bus: Bus, client: Client, body_limit: usize) -> Self {
        Self {
            bus,
            client,
            body_limit,
        }
    }

    /// Fetches the root page of `target:port` and publishes what it finds.
    ///
    /// A service that does not answer HTTP is not an error: it yields `Ok(None)`.
    pub async fn analyze(&self, target: &str, port: u16) -> Result<Option<WebPage>, Error> {
        let url = base_url(target, port);
        debug!(%url, "analyzing web service");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(%url, error = %e, "no http answer");
                return Ok(None);
            }
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = read_prefix(response, self.body_limit).await;

        let service = HttpService {
            server: header_str(&headers, SERVER.as_str()).to_string(),
            tech: detect_tech(&headers, &body),
            port,
        };
        let page = WebPage {
            url,
            status,
            title: extract_title(&body),
            service,
        };

        success!(
            url = %page.url,
            status,
            title = %page.title,
            server = %page.service.server,
            tech = %page.service.tech,
            "web service identified"
        );
        self.bus.publish(Event::http_service(target, &page.service)).await?;
        Ok(Some(page))
    }
}

/// Reads at most `limit` bytes of the body. A body that breaks off midway
/// keeps whatever arrived.
async fn read_prefix(mut response: Response, limit: usize) -> String {
    let mut buf: Vec<u8> = Vec::with_capacity(limit.min(8192));
    while buf.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                info!(error = %e, "body read interrupted");
                break;
            }
        }
    }
    buf.truncate(limit);
    String::from_utf8_lossy(&buf).into_owned()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

pub fn extract_title(body: &str) -> String {
    TITLE_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "No Title".to_string())
}

/// Comma separated technology names, or `Unknown`.
pub fn detect_tech(headers: &HeaderMap, body: &str) -> String {
    let powered_by = header_str(headers, "x-powered-by");
    let server = header_str(headers, SERVER.as_str());

    let mut detected = Vec::new();
    if powered_by.contains("PHP") {
        detected.push("PHP");
    }
    if server.contains("Apache") {
        detected.push("Apache");
    }
    if server.contains("nginx") {
        detected.push("Nginx");
    }
    if body.contains("wp-content") {
        detected.push("WordPress");
    }
    if body.contains("react") || body.contains("_next") {
        detected.push("React/Next.js");
    }

    if detected.is_empty() {
        "Unknown".to_string()
    } else {
        detected.join(", ")
    }
}
