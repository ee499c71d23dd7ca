//! Prometheus instant-query client.
//!
//! This crate provides:
//! - `QueryBackend` trait so the aggregation pipeline can run against any source
//! - `PrometheusClient`, the HTTP implementation of `/api/v1/query`
//! - `Sample`, one `(labels, [timestamp, value])` row of a `vector` result

pub mod client;
pub mod error;
pub mod sample;

pub use client::{execute, PrometheusClient, QUERY_PATH, SESSION_COOKIE};
pub use error::QueryError;
pub use sample::Sample;

/// A source of instant-query results.
#[async_trait::async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run one query expression and return every sample of the result vector.
    async fn query(&self, expr: &str) -> Result<Vec<Sample>, QueryError>;
}
