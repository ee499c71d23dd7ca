use std::path::PathBuf;

use clap::Parser;
use svcreport_core::ReportFormat;

/// Per-service request report from a Prometheus-compatible backend.
///
/// Settings come from the environment (and a `.env` file); see `BASE_URL`,
/// `SERVICES` and the `REPORT_*`, `EMAIL_*` and `SMTP_*` variables.
#[derive(Parser, Debug)]
#[command(name = "svcreport", about = "Build and mail the service request report")]
pub struct CliArgs {
    /// Print the report to stdout instead of mailing it
    #[arg(long, env = "REPORT_DRY_RUN")]
    pub dry_run: bool,

    /// Output formats to produce, comma separated (overrides REPORT_FORMATS)
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<ReportFormat>,

    /// Env file to load instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["svcreport"]);
        assert!(!args.dry_run);
        assert!(args.format.is_empty());
        assert!(args.env_file.is_none());
    }

    #[test]
    fn formats_are_comma_separated() {
        let args = CliArgs::parse_from(["svcreport", "--dry-run", "--format", "html,plain"]);
        assert!(args.dry_run);
        assert_eq!(args.format, vec![ReportFormat::Html, ReportFormat::Plain]);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(CliArgs::try_parse_from(["svcreport", "--format", "pdf"]).is_err());
    }
}
