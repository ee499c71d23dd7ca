//! Service request report pipeline.
//!
//! Queries run in catalog order against a [`QueryBackend`], samples are grouped
//! per service, incomplete rows are dropped, and the surviving aggregate is
//! rendered as a bordered text table or an HTML table.
//!
//! [`QueryBackend`]: svcreport_prom::QueryBackend

pub mod aggregate;
pub mod catalog;
pub mod driver;
pub mod error;
pub mod render;

pub use aggregate::{aggregate, AggregateResult, Aggregator, PartialAggregate, ServiceRow};
pub use catalog::{Catalog, MetricKind, MetricSpec, MetricValue};
pub use driver::{RenderedReport, ReportDriver, ReportOutput};
pub use error::{CatalogError, RenderError, ReportError, ValueTransformError};
pub use render::{Renderer, TableLayout, EMPTY_REPORT};
