use colored::*;
use indicatif::ProgressStyle;
use recce_common::event::{Event, EventKind};
use recce_core::engine::Observer;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{colors, print};

/// Renders engine activity: phase messages as status lines, probe progress
/// as a bar attached to the run's span.
pub struct ConsoleObserver {
    span: Span,
    quiet: u8,
}

impl ConsoleObserver {
    pub fn new(span: Span, quiet: u8) -> Self {
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.blue} {msg} [{bar:30.green/white}] {pos}/{len} ({eta})",
        ) {
            span.pb_set_style(&style);
        }
        Self { span, quiet }
    }
}

impl Observer for ConsoleObserver {
    fn on_event(&self, event: &Event) {
        let label = match event.kind {
            EventKind::SubdomainFound => "subdomain",
            EventKind::PortOpen => "open port",
            EventKind::HttpServiceIdentified => "web service",
            EventKind::VulnerabilityFound => "finding",
        };
        self.span.pb_set_message(
            &format!("latest {}: {}", label, event.target.as_str().bold())
                .color(colors::TEXT_DEFAULT)
                .to_string(),
        );
    }

    fn on_log(&self, message: &str) {
        if self.quiet == 0 {
            print::print_status(message);
        }
    }

    fn on_progress(&self, completed: u64, total: u64) {
        self.span.pb_set_length(total);
        self.span.pb_set_position(completed);
    }
}
