mod cli;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use svcreport_core::config::{load_dotenv, load_dotenv_from};
use svcreport_core::Config;
use svcreport_notify::EmailNotifier;
use svcreport_prom::PrometheusClient;
use svcreport_report::{ReportDriver, ReportOutput};

use crate::cli::CliArgs;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report in dry-run mode.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    match &args.env_file {
        Some(path) => load_dotenv_from(path)?,
        None => load_dotenv(),
    }

    let config = Config::from_env().context("failed to load configuration")?;
    config.log_summary();

    let driver = ReportDriver::from_config(&config).context("invalid report settings")?;
    let client = PrometheusClient::from_config(&config.backend)
        .context("failed to create metrics client")?;

    let formats = if args.format.is_empty() {
        driver.formats().to_vec()
    } else {
        args.format.clone()
    };

    let notifier = if args.dry_run {
        None
    } else if config.mail.is_configured() {
        Some(EmailNotifier::from_mail_config(&config.mail).context("invalid mail settings")?)
    } else {
        info!("mail transport not configured, writing report to stdout");
        None
    };

    let output = driver
        .build(&client, &formats)
        .await
        .context("report generation failed")?;

    match notifier {
        Some(notifier) => driver
            .deliver(&notifier, &output)
            .await
            .context("report delivery failed")?,
        None => print_report(&output)?,
    }

    Ok(())
}

fn print_report(output: &ReportOutput) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for (i, report) in output.reports.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        for line in &report.lines {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()
}
