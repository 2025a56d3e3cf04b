mod bundle;
mod cli;
mod config;
mod deploy;
mod error;
mod fingerprint;
mod ui;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tmsh::SshChannel;

use bundle::{AppliedCertificate, CertificateBundle};
use cli::Cli;
use config::{DeployConfig, Settings};
use deploy::Deployer;
use error::ConfigError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&e.to_string());
            for cause in e.chain().skip(1) {
                ui::cause(&cause.to_string());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file = Settings::load(cli.config.as_deref())?;
    let config = DeployConfig::resolve(file, cli.settings())?;
    log::debug!("Resolved configuration: {config:?}");

    let lineage = cli
        .renewed_lineage
        .as_deref()
        .ok_or(ConfigError::MissingLineage)?;
    let bundle = CertificateBundle::load(lineage)
        .with_context(|| format!("Could not load certificate bundle from {}", lineage.display()))?;
    let certificate = AppliedCertificate::new(bundle, config.cert_name.clone());

    let deployer = Deployer::from_config(&config, certificate)?;
    let mut channel =
        SshChannel::new(&config.host).with_options(config.ssh_options.iter().cloned());

    let summary = deployer
        .deploy(&mut channel, cli.dry_run, &mut io::stdout().lock())
        .with_context(|| format!("Deployment to {} aborted", deployer.host()))?;

    if !summary.dry_run {
        ui::success(&format!(
            "Deployed `{}` to {} ({} steps)",
            deployer.certificate().name,
            deployer.host(),
            summary.executed
        ));
    }
    Ok(())
}
