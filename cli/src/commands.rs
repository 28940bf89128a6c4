pub mod rules;
pub mod scan;

use clap::{Args, Parser, Subcommand};
use recce_common::network::target::{Domain, TargetSelection};

#[derive(Parser)]
#[command(name = "recce")]
#[command(version, about = "An autonomous reconnaissance engine.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print less; repeat to print only the results
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover, scan and analyze a domain
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// List the built-in rules and file checklists
    #[command(alias = "r")]
    Rules,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Root domain, e.g. example.com
    #[arg(short, long)]
    pub domain: Domain,

    /// Probe all 65535 ports on every live subdomain
    #[arg(long)]
    pub deep: bool,

    /// Deep scan only some subdomains: `a` for all, or 1-based indices like `1,3,5`
    #[arg(long, value_name = "SELECTION", conflicts_with = "deep")]
    pub pick: Option<TargetSelection>,

    /// Explicit ports, e.g. `22,80,8000-8100`
    #[arg(long, conflicts_with_all = ["deep", "pick"])]
    pub ports: Option<String>,

    /// Maximum number of port probes in flight
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Connect timeout per port probe
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Skip passive sources and brute-force subdomains
    #[arg(long)]
    pub no_passive: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_requires_a_domain() {
        assert!(CommandLine::try_parse_from(["recce", "scan"]).is_err());
        assert!(CommandLine::try_parse_from(["recce", "scan", "-d", "not a domain"]).is_err());
    }

    #[test]
    fn scan_flags_parse() {
        let cli = CommandLine::try_parse_from(["recce", "-qq", "scan", "-d", "Example.com", "--pick", "1,3"])
            .unwrap();
        assert_eq!(cli.quiet, 2);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.domain.as_str(), "example.com");
        assert_eq!(args.pick, Some(TargetSelection::Indices(vec![1, 3])));
    }

    #[test]
    fn deep_conflicts_with_pick() {
        assert!(
            CommandLine::try_parse_from(["recce", "scan", "-d", "example.com", "--deep", "--pick", "a"]).is_err()
        );
    }
}
