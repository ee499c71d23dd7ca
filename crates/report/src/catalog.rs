//! The ordered set of metrics that make up a report.
//!
//! Each [`MetricSpec`] pairs a PromQL expression with a [`MetricKind`]; the kind
//! turns the backend's raw value string into a typed [`MetricValue`] that both
//! displays and sorts correctly. Catalog order is column order.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use svcreport_core::CatalogChoice;

use crate::error::{CatalogError, ValueTransformError};

pub const REQUEST_COUNT: &str = "Request count";
pub const ERROR_RATE_DOWN_TIME: &str = "Error rate down time";
pub const LATENCY_DOWN_TIME: &str = "Latency down time";
pub const ERROR_RATE_UPTIME: &str = "Error rate uptime";
pub const LATENCY_UPTIME: &str = "Latency uptime";

/// How a raw value string becomes a display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricKind {
    /// Integer count, truncated toward zero.
    Count,
    /// Ratio in `[0, 1]` shown as a percentage.
    Percentage,
    /// Ratio of a window shown as hours of that window.
    DurationHours { window_hours: u32 },
}

impl MetricKind {
    /// Parse `raw` and convert it to this kind's typed value.
    pub fn transform(&self, raw: &str) -> Result<MetricValue, ValueTransformError> {
        let x = parse_finite(raw)?;
        match self {
            Self::Count => {
                let n = x.trunc();
                if n.abs() >= i64::MAX as f64 {
                    return Err(ValueTransformError {
                        raw: raw.to_string(),
                        reason: "count out of range".to_string(),
                    });
                }
                Ok(MetricValue::Count(n as i64))
            }
            Self::Percentage => Ok(MetricValue::Percentage(x * 100.0)),
            Self::DurationHours { window_hours } => {
                Ok(MetricValue::Hours(x * f64::from(*window_hours)))
            }
        }
    }
}

fn parse_finite(raw: &str) -> Result<f64, ValueTransformError> {
    let x: f64 = raw.trim().parse().map_err(|e: std::num::ParseFloatError| {
        ValueTransformError {
            raw: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    if !x.is_finite() {
        return Err(ValueTransformError {
            raw: raw.to_string(),
            reason: "value is not finite".to_string(),
        });
    }
    Ok(x)
}

/// A transformed metric value. Compared by magnitude, never by display string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    Count(i64),
    Percentage(f64),
    Hours(f64),
}

impl MetricValue {
    /// Numeric magnitude used for ordering.
    pub fn sort_key(&self) -> f64 {
        match self {
            Self::Count(n) => *n as f64,
            Self::Percentage(p) => *p,
            Self::Hours(h) => *h,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => a.cmp(b),
            _ => self.sort_key().total_cmp(&other.sort_key()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Percentage(p) => write!(f, "{p:.2}%"),
            Self::Hours(h) => write!(f, "{h:.2} hours"),
        }
    }
}

/// One report column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    /// Display name, unique within a catalog.
    pub name: String,
    /// PromQL expression sent to the backend as-is.
    pub query: String,
    pub kind: MetricKind,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, query: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            kind,
        }
    }

    pub fn transform(&self, raw: &str) -> Result<MetricValue, ValueTransformError> {
        self.kind.transform(raw)
    }
}

/// Ordered, immutable list of metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    metrics: Vec<MetricSpec>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists and duplicate names.
    pub fn new(metrics: Vec<MetricSpec>) -> Result<Self, CatalogError> {
        if metrics.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for spec in &metrics {
            if !seen.insert(spec.name.as_str()) {
                return Err(CatalogError::DuplicateMetric(spec.name.clone()));
            }
        }
        Ok(Self { metrics })
    }

    /// Request count per service over the last `window_days`.
    pub fn requests(window_days: u32) -> Self {
        Self {
            metrics: vec![request_count(window_days)],
        }
    }

    /// Request count plus the error-rate and latency SLIs over the last `window_days`.
    pub fn slo(window_days: u32) -> Self {
        let window_hours = window_days.saturating_mul(24);
        let down_time = MetricKind::DurationHours { window_hours };
        Self {
            metrics: vec![
                request_count(window_days),
                MetricSpec::new(
                    ERROR_RATE_DOWN_TIME,
                    format!(
                        "(1 - avg_over_time(service:sli:status_5xx:pctl5rate5m[{window_days}d]))"
                    ),
                    down_time,
                ),
                MetricSpec::new(
                    LATENCY_DOWN_TIME,
                    format!(
                        "(1 - avg_over_time(service:sli:latency_gt_2000:pctl5rate5m[{window_days}d]))"
                    ),
                    down_time,
                ),
                MetricSpec::new(
                    ERROR_RATE_UPTIME,
                    format!("avg_over_time(service:sli:status_5xx:pctl5rate5m[{window_days}d])"),
                    MetricKind::Percentage,
                ),
                MetricSpec::new(
                    LATENCY_UPTIME,
                    format!(
                        "avg_over_time(service:sli:latency_gt_2000:pctl5rate5m[{window_days}d])"
                    ),
                    MetricKind::Percentage,
                ),
            ],
        }
    }

    pub fn for_choice(choice: CatalogChoice, window_days: u32) -> Self {
        match choice {
            CatalogChoice::Requests => Self::requests(window_days),
            CatalogChoice::Slo => Self::slo(window_days),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metric names in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

fn request_count(window_days: u32) -> MetricSpec {
    MetricSpec::new(
        REQUEST_COUNT,
        format!("sum(increase(api_3scale_gateway_api_time_count[{window_days}d])) by (service)"),
        MetricKind::Count,
    )
}
