use colored::*;
use recce_core::orchestrator::{ReconReport, TargetReport};

use crate::terminal::colors;

type Detail = (String, ColoredString);

pub fn ports_to_str(ports: &[u16]) -> String {
    ports.iter().map(u16::to_string).collect::<Vec<_>>().join(", ")
}

/// Tree rows for one scanned host: mode, open ports, services, then findings.
pub fn target_to_details(target: &TargetReport, report: &ReconReport) -> Vec<Detail> {
    let mode = if target.deep { "deep" } else { "quick" };
    let mut details: Vec<Detail> = vec![
        ("Mode".to_string(), mode.color(colors::TEXT_DEFAULT)),
        ("Ports".to_string(), ports_to_str(&target.open_ports).color(colors::PORT)),
    ];

    for service in report.services.iter().filter(|s| s.host == target.host) {
        let server = if service.server.is_empty() { "?" } else { service.server.as_str() };
        let value = format!("{} {} {}", service.port, server, service.tech.color(colors::TECH));
        details.push(("HTTP".to_string(), value.normal()));
    }

    for finding in report.findings.iter().filter(|f| f.host == target.host) {
        details.push(("Finding".to_string(), finding.detail.color(colors::FINDING)));
    }

    details
}
