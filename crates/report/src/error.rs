use svcreport_core::ConfigError;
use svcreport_notify::NotifyError;
use svcreport_prom::QueryError;

/// A raw backend value that a metric's transform could not turn into a number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot transform {raw:?}: {reason}")]
pub struct ValueTransformError {
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no metrics")]
    Empty,

    #[error("metric {0:?} appears more than once")]
    DuplicateMetric(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("sort metric {0:?} is not in the catalog")]
    UnknownSortMetric(String),
}

/// Anything that aborts a report run.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}
