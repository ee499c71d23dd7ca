//! HTTP client for the Prometheus instant-query API.
//!
//! Every query is a single `GET <base_url>/api/v1/query?query=<expr>`; the
//! `data.result` list of the JSON response is returned as [`Sample`]s.
//! There are no retries: the first failure is handed back to the caller.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use svcreport_core::BackendConfig;

use crate::error::QueryError;
use crate::sample::Sample;
use crate::QueryBackend;

/// Path of the instant-query endpoint, appended to the backend base URL.
pub const QUERY_PATH: &str = "/api/v1/query";

/// Cookie name that carries the oauth-proxy session token.
pub const SESSION_COOKIE: &str = "_oauth_proxy";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a single Prometheus endpoint.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    base_url: String,
    http: reqwest::Client,
}

impl PrometheusClient {
    /// Create a client for `base_url`, optionally authenticated by `session_token`.
    ///
    /// Certificate validation is switched off: the backend is an internal
    /// endpoint serving a self-signed certificate, and that endpoint is
    /// trusted as configured. Requests are bounded by `timeout`.
    pub fn new(
        base_url: &str,
        session_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, QueryError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| QueryError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = session_token {
            let mut cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
                .map_err(|e| QueryError::InvalidToken(e.to_string()))?;
            cookie.set_sensitive(true);
            headers.insert(COOKIE, cookie);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        warn!(
            base_url = %base_url,
            "TLS certificate verification disabled for metrics backend"
        );

        Ok(Self { base_url, http })
    }

    /// Build a client from the `BackendConfig` section.
    pub fn from_config(config: &BackendConfig) -> Result<Self, QueryError> {
        Self::new(
            &config.base_url,
            config.cookie.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for `expr`, with the expression URL-encoded.
    pub fn query_url(&self, expr: &str) -> Result<Url, QueryError> {
        let endpoint = format!("{}{}", self.base_url, QUERY_PATH);
        Url::parse_with_params(&endpoint, &[("query", expr)])
            .map_err(|e| QueryError::InvalidUrl(format!("{endpoint}: {e}")))
    }

    /// Run one instant query.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Backend`] when the status is not `200 OK`
    /// - [`QueryError::MalformedResponse`] when `data.result` is missing or is
    ///   not a list of samples
    /// - [`QueryError::Http`] on transport failures, including timeouts
    pub async fn execute(&self, expr: &str) -> Result<Vec<Sample>, QueryError> {
        let url = self.query_url(expr)?;
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(%status, query = expr, "metrics backend returned non-200 status");
            return Err(QueryError::Backend {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let samples = parse_result(&body)?;
        debug!(query = expr, samples = samples.len(), "query complete");
        Ok(samples)
    }
}

#[async_trait::async_trait]
impl QueryBackend for PrometheusClient {
    async fn query(&self, expr: &str) -> Result<Vec<Sample>, QueryError> {
        self.execute(expr).await
    }
}

/// One-shot query with a default client.
pub async fn execute(
    query: &str,
    base_url: &str,
    session_token: Option<&str>,
) -> Result<Vec<Sample>, QueryError> {
    PrometheusClient::new(base_url, session_token, DEFAULT_TIMEOUT)?
        .execute(query)
        .await
}

/// Extract `data.result` from a query response body.
pub(crate) fn parse_result(body: &str) -> Result<Vec<Sample>, QueryError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| QueryError::MalformedResponse(format!("body is not JSON: {e}")))?;

    let result = json
        .pointer("/data/result")
        .ok_or_else(|| QueryError::MalformedResponse("missing data.result".to_string()))?;

    if !result.is_array() {
        return Err(QueryError::MalformedResponse(
            "data.result is not a list".to_string(),
        ));
    }

    serde_json::from_value(result.clone())
        .map_err(|e| QueryError::MalformedResponse(format!("unexpected sample shape: {e}")))
}
