//! # Event Model
//!
//! An [`Event`] is the unit of information the decision engine reacts to. It is
//! immutable once published and has no identity beyond its fields, so consumers
//! must tolerate duplicates.

use std::fmt;
use std::str::FromStr;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    PortOpen,
    HttpServiceIdentified,
    VulnerabilityFound,
    SubdomainFound,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PortOpen => "PORT_OPEN",
            EventKind::HttpServiceIdentified => "HTTP_SERVICE",
            EventKind::VulnerabilityFound => "VULN_FOUND",
            EventKind::SubdomainFound => "SUBDOMAIN_FOUND",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    /// Hostname or IP address the fact is about.
    pub target: String,
    /// Free-form detail: a port number, a service summary, a finding.
    pub payload: String,
}

impl Event {
    pub fn new(kind: EventKind, target: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            payload: payload.into(),
        }
    }

    pub fn port_open(target: impl Into<String>, port: u16) -> Self {
        Self::new(EventKind::PortOpen, target, port.to_string())
    }

    pub fn http_service(target: impl Into<String>, service: &HttpService) -> Self {
        Self::new(EventKind::HttpServiceIdentified, target, service.to_string())
    }

    pub fn vulnerability(target: impl Into<String>, finding: impl Into<String>) -> Self {
        Self::new(EventKind::VulnerabilityFound, target, finding)
    }

    pub fn subdomain(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(EventKind::SubdomainFound, target, source)
    }

    /// The port carried by a `PortOpen` event.
    pub fn port(&self) -> Option<u16> {
        match self.kind {
            EventKind::PortOpen => self.payload.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ({})", self.kind, self.target, self.payload)
    }
}

/// Payload of an `HttpServiceIdentified` event, encoded as `server|tech|port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpService {
    pub server: String,
    pub tech: String,
    pub port: u16,
}

impl fmt::Display for HttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.server, self.tech, self.port)
    }
}

impl FromStr for HttpService {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Server banners may contain '|', so split from the right.
        let mut parts = s.rsplitn(3, '|');
        let port = parts.next();
        let tech = parts.next();
        let server = parts.next();

        match (server, tech, port) {
            (Some(server), Some(tech), Some(port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidPayload(s.to_string()))?;
                Ok(HttpService {
                    server: server.to_string(),
                    tech: tech.to_string(),
                    port,
                })
            }
            _ => Err(Error::InvalidPayload(s.to_string())),
        }
    }
}
