//! Context-aware sensitive file discovery.
//!
//! The paths probed depend on the technology string the HTTP analyzer
//! reported, matched by substring. A bare `200 OK` counts as a hit; there is
//! no soft-404 filtering.

use recce_common::config::HttpConfig;
use recce_common::event::Event;
use recce_common::{Error, success};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::engine::Bus;
use crate::http::{base_url, build_client};

/// Checked on every web service.
pub const GENERIC_PATHS: &[&str] = &["robots.txt", ".env", ".git/HEAD", "sitemap.xml"];

/// Extra paths per technology, keyed by the name `detect_tech` reports.
pub const TECH_PATHS: &[(&str, &[&str])] = &[
    ("Apache", &[".htaccess", ".htpasswd", "server-status", "server-info"]),
    ("WordPress", &["wp-config.php.bak", "wp-admin/admin-ajax.php"]),
    ("Nginx", &["nginx.conf"]),
];

/// Paths to probe for `tech`, generic ones first, without duplicates.
pub fn checklist(tech: &str) -> Vec<&'static str> {
    let specific = TECH_PATHS
        .iter()
        .filter(|(name, _)| tech.contains(name))
        .flat_map(|(_, paths)| paths.iter().copied());

    let mut paths: Vec<&'static str> = Vec::new();
    for path in GENERIC_PATHS.iter().copied().chain(specific) {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

pub struct FileHunter {
    bus: Bus,
    client: Client,
}

impl FileHunter {
    pub fn new(bus: Bus, config: &HttpConfig) -> Result<Self, Error> {
        let client = build_client(config, config.hunt_timeout, false)?;
        Ok(Self::with_client(bus, client))
    }

    pub fn with_client(bus: Bus, client: Client) -> Self {
        Self { bus, client }
    }

    /// Probes the checklist for `tech` and returns the paths that answered 200.
    pub async fn hunt(&self, target: &str, port: u16, tech: &str) -> Result<Vec<String>, Error> {
        let base = base_url(target, port);
        let paths = checklist(tech);
        info!(%base, tech, paths = paths.len(), "starting context hunt");

        let mut found = Vec::new();
        for path in paths {
            let url = format!("{base}/{path}");
            let status = match self.client.get(&url).send().await {
                Ok(response) => response.status(),
                Err(e) => {
                    debug!(%url, error = %e, "probe failed");
                    continue;
                }
            };

            if status == StatusCode::OK {
                success!(%url, "sensitive file exposed");
                self.bus
                    .publish(Event::vulnerability(target, format!("Sensitive File: {path}")))
                    .await?;
                found.push(path.to_string());
            }
        }

        Ok(found)
    }
}
