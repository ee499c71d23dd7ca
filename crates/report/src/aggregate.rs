//! Group query samples by service and keep only fully-populated rows.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use svcreport_core::config::{DEFAULT_SERVICE_LABEL, DEFAULT_TIMEOUT_SECS};
use svcreport_prom::{PrometheusClient, QueryBackend, QueryError, Sample};

use crate::catalog::{Catalog, MetricSpec, MetricValue};

/// Metric values of one service, keyed by metric display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceRow {
    values: IndexMap<String, MetricValue>,
}

impl ServiceRow {
    pub fn get(&self, metric: &str) -> Option<&MetricValue> {
        self.values.get(metric)
    }

    /// Store a value, returning the one it replaced.
    pub fn insert(&mut self, metric: impl Into<String>, value: MetricValue) -> Option<MetricValue> {
        self.values.insert(metric.into(), value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when the row's metric names are exactly the catalog's.
    pub fn is_complete(&self, catalog: &Catalog) -> bool {
        self.values.len() == catalog.len() && catalog.names().all(|n| self.values.contains_key(n))
    }

    /// The same row re-keyed in catalog order, or `None` if it is incomplete.
    fn in_catalog_order(&self, catalog: &Catalog) -> Option<ServiceRow> {
        if !self.is_complete(catalog) {
            return None;
        }
        let values = catalog
            .names()
            .filter_map(|n| self.values.get(n).map(|v| (n.to_string(), *v)))
            .collect();
        Some(ServiceRow { values })
    }
}

/// Rows under construction; may hold incomplete services.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialAggregate {
    rows: BTreeMap<String, ServiceRow>,
}

impl PartialAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `(service, metric)`, returning any value it replaced.
    pub fn insert(&mut self, service: &str, metric: &str, value: MetricValue) -> Option<MetricValue> {
        self.rows
            .entry(service.to_string())
            .or_default()
            .insert(metric, value)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows holding every catalog metric, in catalog order.
    pub fn complete(&self, catalog: &Catalog) -> AggregateResult {
        let rows = self
            .rows
            .iter()
            .filter_map(|(service, row)| {
                row.in_catalog_order(catalog)
                    .map(|row| (service.clone(), row))
            })
            .collect();
        AggregateResult { rows }
    }
}

/// Complete service rows, keyed and iterated by service identifier.
///
/// Every row holds exactly the catalog's metrics, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    rows: BTreeMap<String, ServiceRow>,
}

impl AggregateResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, service: &str) -> Option<&ServiceRow> {
        self.rows.get(service)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Rows in ascending service order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceRow)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Re-apply the completeness filter. Idempotent.
    pub fn retain_complete(self, catalog: &Catalog) -> Self {
        let rows = self
            .rows
            .into_iter()
            .filter_map(|(service, row)| row.in_catalog_order(catalog).map(|row| (service, row)))
            .collect();
        Self { rows }
    }
}

#[derive(Debug, Default)]
struct Counters {
    samples: usize,
    not_allowed: usize,
    unlabeled: usize,
    transform_failures: usize,
    overwritten: usize,
}

/// Runs every catalog query and folds the samples into an [`AggregateResult`].
pub struct Aggregator<'a> {
    catalog: &'a Catalog,
    backend: &'a dyn QueryBackend,
    allowed: HashSet<String>,
    service_label: String,
}

impl<'a> Aggregator<'a> {
    pub fn new<I, S>(catalog: &'a Catalog, backend: &'a dyn QueryBackend, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog,
            backend,
            allowed: allowed.into_iter().map(Into::into).collect(),
            service_label: DEFAULT_SERVICE_LABEL.to_string(),
        }
    }

    /// Read the service identifier from `label` instead of `service`.
    pub fn with_service_label(mut self, label: impl Into<String>) -> Self {
        self.service_label = label.into();
        self
    }

    /// Query every metric in catalog order and return the complete rows.
    ///
    /// The first query failure aborts the run; no partial result is returned.
    pub async fn run(&self) -> Result<AggregateResult, QueryError> {
        let mut partial = PartialAggregate::new();
        let mut counters = Counters::default();

        for spec in self.catalog.iter() {
            let samples = self.backend.query(&spec.query).await?;
            debug!(metric = %spec.name, samples = samples.len(), "query returned");
            self.collect(spec, &samples, &mut partial, &mut counters);
        }

        let result = partial.complete(self.catalog);
        info!(
            services = result.len(),
            incomplete = partial.len() - result.len(),
            samples = counters.samples,
            not_allowed = counters.not_allowed,
            unlabeled = counters.unlabeled,
            transform_failures = counters.transform_failures,
            overwritten = counters.overwritten,
            "aggregation complete"
        );
        Ok(result)
    }

    fn collect(
        &self,
        spec: &MetricSpec,
        samples: &[Sample],
        partial: &mut PartialAggregate,
        counters: &mut Counters,
    ) {
        for sample in samples {
            counters.samples += 1;

            let Some(service) = sample.label(&self.service_label) else {
                counters.unlabeled += 1;
                warn!(
                    metric = %spec.name,
                    label = %self.service_label,
                    labels = ?sample.metric,
                    "sample has no service label, skipping"
                );
                continue;
            };

            if !self.allowed.contains(service) {
                counters.not_allowed += 1;
                debug!(metric = %spec.name, service, "service not in allow-list");
                continue;
            }

            match spec.transform(sample.raw_value()) {
                Ok(value) => {
                    if partial.insert(service, &spec.name, value).is_some() {
                        counters.overwritten += 1;
                        warn!(
                            metric = %spec.name,
                            service,
                            "duplicate sample for service, keeping the last one"
                        );
                    }
                }
                Err(e) => {
                    counters.transform_failures += 1;
                    warn!(
                        metric = %spec.name,
                        service,
                        raw = sample.raw_value(),
                        error = %e,
                        "value transform failed, service will be left out"
                    );
                }
            }
        }
    }
}

/// Aggregate straight from a Prometheus endpoint with default client settings.
pub async fn aggregate<I, S>(
    catalog: &Catalog,
    base_url: &str,
    session_token: Option<&str>,
    allowed_services: I,
) -> Result<AggregateResult, QueryError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    let client = PrometheusClient::new(base_url, session_token, timeout)?;
    Aggregator::new(catalog, &client, allowed_services).run().await
}
