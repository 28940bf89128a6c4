use std::sync::{Mutex, PoisonError};

use recce_common::event::{Event, EventKind, HttpService};

use crate::engine::{DispatchReport, Observer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub host: String,
    pub deep: bool,
    pub open_ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceReport {
    pub host: String,
    pub server: String,
    pub tech: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Finding {
    pub host: String,
    pub detail: String,
}

/// Everything one run produced.
#[derive(Debug, Clone, Default)]
pub struct ReconReport {
    pub domain: Option<String>,
    pub subdomains: Vec<String>,
    pub targets: Vec<TargetReport>,
    pub services: Vec<ServiceReport>,
    pub findings: Vec<Finding>,
    pub dispatch: DispatchReport,
}

impl ReconReport {
    pub fn open_port_count(&self) -> usize {
        self.targets.iter().map(|t| t.open_ports.len()).sum()
    }

    /// Nothing worth printing beyond "0 results".
    pub fn is_empty(&self) -> bool {
        self.open_port_count() == 0 && self.services.is_empty() && self.findings.is_empty()
    }
}

/// Observer that keeps the facts the report is built from.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    services: Mutex<Vec<ServiceReport>>,
    findings: Mutex<Vec<Finding>>,
}

impl Collector {
    /// Sorted, since reactions finish in no particular order.
    pub(crate) fn take(&self) -> (Vec<ServiceReport>, Vec<Finding>) {
        let mut services = std::mem::take(&mut *self.services.lock().unwrap_or_else(PoisonError::into_inner));
        let mut findings = std::mem::take(&mut *self.findings.lock().unwrap_or_else(PoisonError::into_inner));
        services.sort();
        findings.sort();
        (services, findings)
    }
}

impl Observer for Collector {
    fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::HttpServiceIdentified => {
                if let Ok(service) = event.payload.parse::<HttpService>() {
                    self.services
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(ServiceReport {
                            host: event.target.clone(),
                            server: service.server,
                            tech: service.tech,
                            port: service.port,
                        });
                }
            }
            EventKind::VulnerabilityFound => {
                self.findings
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(Finding {
                        host: event.target.clone(),
                        detail: event.payload.clone(),
                    });
            }
            EventKind::PortOpen | EventKind::SubdomainFound => {}
        }
    }
}
