//! Built-in reactions.
//!
//! * `Web-Discovery`: an open web port gets an HTTP fingerprint.
//! * `Context-Hunter`: a fingerprinted service gets a sensitive file hunt
//!   tailored to its technology.

use std::sync::Arc;

use recce_common::event::{Event, EventKind, HttpService};
use tracing::{error, warn};

use crate::engine::Rule;
use crate::http::HttpAnalyzer;
use crate::hunter::FileHunter;

pub const WEB_DISCOVERY: &str = "Web-Discovery";
pub const CONTEXT_HUNTER: &str = "Context-Hunter";

/// Human readable summary of a built-in rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub name: &'static str,
    pub trigger: EventKind,
    pub description: &'static str,
}

pub const BUILTIN: &[RuleInfo] = &[
    RuleInfo {
        name: WEB_DISCOVERY,
        trigger: EventKind::PortOpen,
        description: "fingerprints HTTP services found on web ports",
    },
    RuleInfo {
        name: CONTEXT_HUNTER,
        trigger: EventKind::HttpServiceIdentified,
        description: "probes technology specific sensitive files",
    },
];

pub fn web_discovery(analyzer: Arc<HttpAnalyzer>, web_ports: Vec<u16>) -> Rule {
    Rule::new(
        WEB_DISCOVERY,
        move |event: &Event| event.port().is_some_and(|port| web_ports.contains(&port)),
        move |event: Event| {
            let analyzer = Arc::clone(&analyzer);
            async move {
                let Some(port) = event.port() else { return };
                if let Err(e) = analyzer.analyze(&event.target, port).await {
                    error!(rule = WEB_DISCOVERY, target = %event.target, port, error = %e, "analysis failed");
                }
            }
        },
    )
}

pub fn context_hunter(hunter: Arc<FileHunter>) -> Rule {
    Rule::new(
        CONTEXT_HUNTER,
        |event: &Event| event.kind == EventKind::HttpServiceIdentified,
        move |event: Event| {
            let hunter = Arc::clone(&hunter);
            async move {
                let service = match event.payload.parse::<HttpService>() {
                    Ok(service) => service,
                    Err(e) => {
                        warn!(rule = CONTEXT_HUNTER, target = %event.target, error = %e, "skipping event");
                        return;
                    }
                };
                if let Err(e) = hunter.hunt(&event.target, service.port, &service.tech).await {
                    error!(rule = CONTEXT_HUNTER, target = %event.target, error = %e, "hunt failed");
                }
            }
        },
    )
}
