//! Render an [`AggregateResult`] as lines of text.
//!
//! Both formats share the same header (`Service` then catalog metric names)
//! and the same row order: descending by the sort metric's typed value,
//! ties broken by ascending service name.

mod html;
mod plain;

use std::iter;

use svcreport_core::ReportFormat;

use crate::aggregate::{AggregateResult, ServiceRow};
use crate::catalog::Catalog;
use crate::error::RenderError;

/// Shown instead of a table when no service has complete data.
pub const EMPTY_REPORT: &str = "No services reported a complete set of metrics.";

/// Column widths used when none are configured.
pub const DEFAULT_COLUMN_WIDTHS: [usize; 6] = [32, 30, 28, 26, 26, 26];

/// Lazily produced report lines.
pub type Lines<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// Fixed column widths for the plain-text table, including the border padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    widths: Vec<usize>,
}

impl TableLayout {
    /// Columns past the end of `widths` reuse the last width.
    pub fn new(widths: Vec<usize>) -> Self {
        Self { widths }
    }

    pub fn width(&self, column: usize) -> usize {
        self.widths
            .get(column)
            .or_else(|| self.widths.last())
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTHS[0])
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMN_WIDTHS.to_vec())
    }
}

pub struct Renderer<'a> {
    catalog: &'a Catalog,
    layout: TableLayout,
}

impl<'a> Renderer<'a> {
    pub fn new(catalog: &'a Catalog, layout: TableLayout) -> Self {
        Self { catalog, layout }
    }

    /// Render `aggregate` in `format`, rows sorted by `sort_metric` descending.
    ///
    /// The aggregate is only read; rendering the same input again yields the
    /// same lines.
    pub fn render<'r>(
        &'r self,
        aggregate: &'r AggregateResult,
        format: ReportFormat,
        sort_metric: &str,
    ) -> Result<Lines<'r>, RenderError> {
        if !self.catalog.contains(sort_metric) {
            return Err(RenderError::UnknownSortMetric(sort_metric.to_string()));
        }

        if aggregate.is_empty() {
            let line = match format {
                ReportFormat::Plain => EMPTY_REPORT.to_string(),
                ReportFormat::Html => format!("<p>{}</p>", EMPTY_REPORT),
            };
            return Ok(Box::new(iter::once(line)));
        }

        let header = self.header();
        let rows = sorted(aggregate, sort_metric)
            .into_iter()
            .map(move |(service, row)| self.cells(service, row));

        Ok(match format {
            ReportFormat::Plain => Box::new(plain::lines(&self.layout, header, rows)),
            ReportFormat::Html => Box::new(html::lines(header, rows)),
        })
    }

    fn header(&self) -> Vec<String> {
        iter::once("Service".to_string())
            .chain(self.catalog.names().map(str::to_string))
            .collect()
    }

    fn cells(&self, service: &str, row: &ServiceRow) -> Vec<String> {
        iter::once(service.to_string())
            .chain(
                self.catalog
                    .names()
                    .map(|name| row.get(name).map(|v| v.to_string()).unwrap_or_default()),
            )
            .collect()
    }
}

/// Rows descending by `metric`; the sort is stable over ascending service names.
fn sorted<'r>(aggregate: &'r AggregateResult, metric: &str) -> Vec<(&'r str, &'r ServiceRow)> {
    let mut rows: Vec<_> = aggregate.iter().collect();
    rows.sort_by(|(_, a), (_, b)| match (b.get(metric), a.get(metric)) {
        (Some(b), Some(a)) => b.total_cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    rows
}
