use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use recce_common::config::Config;
use recce_common::network::target::Domain;
use recce_common::success;
use recce_core::orchestrator::{Orchestrator, ReconReport, TargetReport};
use tracing::{Instrument, info_span};

use crate::mprint;
use crate::terminal::{colors, format, print, progress::ConsoleObserver};

pub async fn scan(domain: Domain, cfg: Config) -> anyhow::Result<()> {
    let span = info_span!("recon", indicatif.pb_show = true);
    let observer = Arc::new(ConsoleObserver::new(span.clone(), cfg.quiet));
    let quiet = cfg.quiet;

    let start_time = Instant::now();
    let report = Orchestrator::new(cfg)
        .with_observer(observer)
        .run(&domain)
        .instrument(span)
        .await?;

    recon_ends(&report, start_time.elapsed(), quiet);

    let rejected = report.dispatch.rejected_after_close;
    if rejected > 0 {
        anyhow::bail!("{rejected} events were published after the engine shut down");
    }
    Ok(())
}

fn recon_ends(report: &ReconReport, total_time: Duration, quiet: u8) {
    if report.is_empty() {
        print::header("zero results", quiet);
        print::no_results();
        print_summary(report, total_time, quiet);
        return;
    }

    if quiet > 0 {
        mprint!();
    }

    print::header("Reconnaissance", quiet);
    print_targets(report);
    print_summary(report, total_time, quiet);
}

fn print_targets(report: &ReconReport) {
    let targets: Vec<&TargetReport> = report
        .targets
        .iter()
        .filter(|t| !t.open_ports.is_empty())
        .collect();

    for (idx, target) in targets.iter().enumerate() {
        print::tree_head(idx, &target.host);
        print::as_tree_one_level(format::target_to_details(target, report));
        if idx + 1 != targets.len() {
            mprint!();
        }
    }
}

fn print_summary(report: &ReconReport, total_time: Duration, quiet: u8) {
    let hosts = format!("{} live hosts", report.subdomains.len()).bold().green();
    let ports = format!("{} open ports", report.open_port_count()).bold().green();
    let findings = format!("{} findings", report.findings.len()).bold().red();
    let total_time = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output = format!("Recon Complete: {hosts}, {ports}, {findings} in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            mprint!();
            success!("{}", output)
        }
    }
}
