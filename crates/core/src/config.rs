use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default lookback window baked into every catalog query.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Default per-request timeout against the metrics backend.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SERVICE_LABEL: &str = "service";
pub const DEFAULT_SORT_METRIC: &str = "Request count";
pub const DEFAULT_SUBJECT: &str = "Service request report {{ date }}";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load an explicit env file. Unlike [`load_dotenv`], a missing file is an error.
pub fn load_dotenv_from(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path)
        .map(|_| ())
        .map_err(|e| ConfigError::EnvFile(format!("{}: {}", path.display(), e)))
}

// ── Env helpers ───────────────────────────────────────────────

/// Key lookup with profile fallback: tries {PROFILE}_{KEY} first, then {KEY}.
/// Empty values count as unset.
struct EnvSource<'a> {
    profile: String,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvSource<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|s| !s.trim().is_empty())
    }

    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            let prefixed = format!("{}_{}", self.profile, key);
            if let Some(v) = self.raw(&prefixed) {
                return Some(v);
            }
        }
        self.raw(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.opt(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.opt(key) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value: v.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.opt(key).map(|v| split_list(&v)).unwrap_or_default()
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub backend: BackendConfig,
    pub report: ReportConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REPORT_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("REPORT_PROFILE")
            .map(|p| p.trim().to_uppercase())
            .unwrap_or_default();
        let src = EnvSource {
            profile: profile.clone(),
            lookup: &lookup,
        };

        Ok(Self {
            profile,
            backend: BackendConfig::from_source(&src)?,
            report: ReportConfig::from_source(&src)?,
            mail: MailConfig::from_source(&src)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  backend:  url={}, cookie={}, timeout={}s, label={}",
            self.backend.base_url,
            if self.backend.cookie.is_some() { "set" } else { "(none)" },
            self.backend.timeout_secs,
            self.backend.service_label
        );
        tracing::info!(
            "  report:   services={}, catalog={}, window={}d, sort={}",
            self.report.services.len(),
            self.report.catalog,
            self.report.window_days,
            self.report.sort_metric
        );
        tracing::info!(
            "  mail:     host={}, to={}, configured={}",
            self.mail.smtp_host.as_deref().unwrap_or("(none)"),
            self.mail.email_to.join(","),
            self.mail.is_configured()
        );
    }
}

// ── Metrics backend ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Session token sent as the `_oauth_proxy` cookie.
    #[serde(skip_serializing)]
    pub cookie: Option<String>,
    pub timeout_secs: u64,
    /// Label that carries the service identifier on every sample.
    pub service_label: String,
}

impl BackendConfig {
    fn from_source(src: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let timeout_secs = src.parsed("REPORT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REPORT_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(Self {
            base_url: src.required("BASE_URL")?,
            cookie: src.opt("COOKIE"),
            timeout_secs,
            service_label: src.or("SERVICE_LABEL", DEFAULT_SERVICE_LABEL),
        })
    }
}

// ── Report ────────────────────────────────────────────────────

/// Which built-in metric catalog drives the report columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogChoice {
    /// Request count only.
    Requests,
    /// Request count plus error-rate and latency SLIs.
    Slo,
}

impl FromStr for CatalogChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "requests" => Ok(Self::Requests),
            "slo" => Ok(Self::Slo),
            other => Err(format!("unknown catalog '{other}' (expected requests or slo)")),
        }
    }
}

impl fmt::Display for CatalogChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requests => f.write_str("requests"),
            Self::Slo => f.write_str("slo"),
        }
    }
}

/// Output flavour of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Plain,
    Html,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown format '{other}' (expected plain or html)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::Html => f.write_str("html"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Allow-list of service identifiers.
    pub services: Vec<String>,
    pub catalog: CatalogChoice,
    pub window_days: u32,
    pub sort_metric: String,
    pub formats: Vec<ReportFormat>,
    /// minijinja template for the mail subject.
    pub subject: String,
}

impl ReportConfig {
    fn from_source(src: &EnvSource<'_>) -> Result<Self, ConfigError> {
        // SERVICES is required but may legitimately be an empty list.
        let services = src
            .opt("SERVICES")
            .or_else(|| (src.lookup)("SERVICES"))
            .map(|v| split_list(&v))
            .ok_or_else(|| ConfigError::Missing("SERVICES".to_string()))?;

        let window_days = src.parsed("REPORT_WINDOW_DAYS", DEFAULT_WINDOW_DAYS)?;
        if window_days == 0 {
            return Err(ConfigError::Invalid {
                key: "REPORT_WINDOW_DAYS".to_string(),
                value: "0".to_string(),
                reason: "window must be at least one day".to_string(),
            });
        }

        let mut formats = Vec::new();
        for raw in src.list("REPORT_FORMATS") {
            let format: ReportFormat = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "REPORT_FORMATS".to_string(),
                value: raw.clone(),
                reason,
            })?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            formats = vec![ReportFormat::Plain, ReportFormat::Html];
        }

        Ok(Self {
            services,
            catalog: src.parsed("REPORT_CATALOG", CatalogChoice::Requests)?,
            window_days,
            sort_metric: src.or("REPORT_SORT_METRIC", DEFAULT_SORT_METRIC),
            formats,
            subject: src.or("REPORT_SUBJECT", DEFAULT_SUBJECT),
        })
    }
}

// ── Mail transport ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub email_to: Vec<String>,
    pub email_from: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_pass: Option<String>,
}

impl MailConfig {
    fn from_source(src: &EnvSource<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            email_to: src.list("EMAIL_TO"),
            email_from: src.opt("EMAIL_FROM"),
            smtp_host: src.opt("SMTP_HOST"),
            smtp_port: src.parsed("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            smtp_user: src.opt("SMTP_USER"),
            smtp_pass: src.opt("SMTP_PASS"),
        })
    }

    /// Delivery needs a sender, at least one recipient and a relay host.
    pub fn is_configured(&self) -> bool {
        !self.email_to.is_empty() && self.email_from.is_some() && self.smtp_host.is_some()
    }

    /// Username/password pair, only when both are present.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.smtp_user, &self.smtp_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = config_from(&[
            ("BASE_URL", "https://prometheus.internal"),
            ("SERVICES", "advisor, insights,,"),
        ])
        .unwrap();

        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.backend.base_url, "https://prometheus.internal");
        assert_eq!(cfg.backend.cookie, None);
        assert_eq!(cfg.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.backend.service_label, "service");
        assert_eq!(cfg.report.services, vec!["advisor", "insights"]);
        assert_eq!(cfg.report.catalog, CatalogChoice::Requests);
        assert_eq!(cfg.report.window_days, 30);
        assert_eq!(cfg.report.sort_metric, "Request count");
        assert_eq!(
            cfg.report.formats,
            vec![ReportFormat::Plain, ReportFormat::Html]
        );
        assert!(!cfg.mail.is_configured());
    }

    #[test]
    fn missing_base_url_is_reported() {
        let err = config_from(&[("SERVICES", "advisor")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BASE_URL".to_string()));
        assert_eq!(err.to_string(), "BASE_URL env var not set");
    }

    #[test]
    fn missing_services_is_reported() {
        let err = config_from(&[("BASE_URL", "http://prom")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SERVICES".to_string()));
    }

    #[test]
    fn empty_services_is_an_empty_allow_list() {
        let cfg = config_from(&[("BASE_URL", "http://prom"), ("SERVICES", "")]).unwrap();
        assert!(cfg.report.services.is_empty());
    }

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        let cfg = config_from(&[
            ("REPORT_PROFILE", "prod"),
            ("BASE_URL", "http://staging"),
            ("PROD_BASE_URL", "http://prod"),
            ("SERVICES", "advisor"),
        ])
        .unwrap();
        assert_eq!(cfg.profile_label(), "PROD");
        assert_eq!(cfg.backend.base_url, "http://prod");
        assert_eq!(cfg.report.services, vec!["advisor"]);
    }

    #[test]
    fn unparsable_number_is_invalid() {
        let err = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("REPORT_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        match err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(key, "REPORT_TIMEOUT_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("REPORT_TIMEOUT_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("REPORT_WINDOW_DAYS", "0"),
        ])
        .unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "REPORT_WINDOW_DAYS"),
            other => panic!("expected Invalid, got: {other:?}"),
        }
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let path = std::env::temp_dir().join("svcreport-no-such-dir/missing.env");
        let err = load_dotenv_from(&path).unwrap_err();
        match err {
            ConfigError::EnvFile(msg) => assert!(msg.contains("missing.env"), "got: {msg}"),
            other => panic!("expected EnvFile, got: {other:?}"),
        }
    }

    #[test]
    fn formats_and_catalog_are_parsed() {
        let cfg = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("REPORT_FORMATS", "html, html"),
            ("REPORT_CATALOG", "SLO"),
            ("REPORT_WINDOW_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(cfg.report.formats, vec![ReportFormat::Html]);
        assert_eq!(cfg.report.catalog, CatalogChoice::Slo);
        assert_eq!(cfg.report.window_days, 7);
    }

    #[test]
    fn unknown_format_is_invalid() {
        let err = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("REPORT_FORMATS", "pdf"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown format"), "got: {err}");
    }

    #[test]
    fn mail_is_configured_with_sender_recipient_and_host() {
        let cfg = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("EMAIL_TO", "ops@example.com,lead@example.com"),
            ("EMAIL_FROM", "reports@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "reports"),
        ])
        .unwrap();
        assert!(cfg.mail.is_configured());
        assert_eq!(cfg.mail.email_to.len(), 2);
        assert_eq!(cfg.mail.smtp_port, DEFAULT_SMTP_PORT);
        // Password missing, so no credentials.
        assert_eq!(cfg.mail.credentials(), None);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let cfg = config_from(&[
            ("BASE_URL", "http://prom"),
            ("SERVICES", "advisor"),
            ("COOKIE", "session-secret"),
            ("SMTP_PASS", "hunter2"),
        ])
        .unwrap();
        let dump = serde_json::to_string(&cfg).unwrap();
        assert!(dump.contains("http://prom"));
        assert!(!dump.contains("session-secret"));
        assert!(!dump.contains("hunter2"));
    }
}
