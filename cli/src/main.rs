mod commands;
mod terminal;

use anyhow::Context;
use commands::{CommandLine, Commands, ScanArgs, rules, scan};
use recce_common::config::Config;
use recce_common::network::ports::parse_port_list;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.quiet);
    print::banner(commands.quiet);

    match commands.command {
        Commands::Scan(args) => {
            let cfg = build_config(&args, commands.quiet)?;
            print::header("starting reconnaissance", cfg.quiet);
            scan::scan(args.domain, cfg).await
        }
        Commands::Rules => {
            print::header("built-in rules", commands.quiet);
            rules::rules(commands.quiet);
            Ok(())
        }
    }
}

fn build_config(args: &ScanArgs, quiet: u8) -> anyhow::Result<Config> {
    let defaults = Config::default();
    let ports = args
        .ports
        .as_deref()
        .map(parse_port_list)
        .transpose()
        .context("invalid --ports")?;

    let mut scan = defaults.scan.clone();
    if let Some(ms) = args.timeout_ms {
        scan.probe_timeout = std::time::Duration::from_millis(ms);
    }

    Ok(Config {
        quiet,
        deep: args.deep,
        selection: args.pick.clone().unwrap_or_default(),
        ports,
        no_passive: args.no_passive,
        global_concurrency: args.concurrency.unwrap_or(defaults.global_concurrency),
        scan,
        ..defaults
    })
}
