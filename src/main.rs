use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use site_deploy::config::{Cli, RunOptions};
use site_deploy::deployer::{execute, NetworkConnector};
use site_deploy::reporter::Reporter;
use site_deploy::rules::TransferRules;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let opts = RunOptions::from_cli(cli);

    init_tracing(opts.verbose)?;

    // Upload progress (verbose mode logs every file instead)
    let progress = if opts.verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let rules = TransferRules::standard();
    let mut reporter = Reporter::console(&opts.env_file);

    let code = execute(&opts, &rules, &NetworkConnector, &mut reporter, &progress);

    Ok(ExitCode::from(code))
}
