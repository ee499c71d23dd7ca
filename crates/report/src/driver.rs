//! One report run: aggregate, render each requested format, hand the result
//! to a delivery channel.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use svcreport_core::{CatalogChoice, Config, ReportFormat};
use svcreport_notify::{BodyKind, Notification, Notifier, SubjectContext, TemplateRenderer};
use svcreport_prom::QueryBackend;

use crate::aggregate::{AggregateResult, Aggregator};
use crate::catalog::Catalog;
use crate::error::{RenderError, ReportError};
use crate::render::{Renderer, TableLayout};

/// The lines of one format, materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub lines: Vec<String>,
}

impl RenderedReport {
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    pub fn body_kind(&self) -> BodyKind {
        match self.format {
            ReportFormat::Plain => BodyKind::Plain,
            ReportFormat::Html => BodyKind::Html,
        }
    }
}

/// Everything produced by [`ReportDriver::build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutput {
    /// Services with a complete row.
    pub services: usize,
    pub reports: Vec<RenderedReport>,
}

pub struct ReportDriver {
    catalog: Catalog,
    catalog_choice: CatalogChoice,
    layout: TableLayout,
    services: Vec<String>,
    service_label: String,
    sort_metric: String,
    window_days: u32,
    formats: Vec<ReportFormat>,
    subject: String,
    templates: TemplateRenderer,
}

impl ReportDriver {
    /// Build the driver from loaded configuration.
    ///
    /// Fails before any query is sent when the sort metric is not part of the
    /// chosen catalog or the subject template does not parse.
    pub fn from_config(config: &Config) -> Result<Self, ReportError> {
        let report = &config.report;
        let catalog = Catalog::for_choice(report.catalog, report.window_days);

        if !catalog.contains(&report.sort_metric) {
            return Err(RenderError::UnknownSortMetric(report.sort_metric.clone()).into());
        }

        let templates = TemplateRenderer::new();
        templates.validate(&report.subject)?;

        Ok(Self {
            catalog,
            catalog_choice: report.catalog,
            layout: TableLayout::default(),
            services: report.services.clone(),
            service_label: config.backend.service_label.clone(),
            sort_metric: report.sort_metric.clone(),
            window_days: report.window_days,
            formats: report.formats.clone(),
            subject: report.subject.clone(),
            templates,
        })
    }

    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn formats(&self) -> &[ReportFormat] {
        &self.formats
    }

    pub async fn aggregate(&self, backend: &dyn QueryBackend) -> Result<AggregateResult, ReportError> {
        let result = Aggregator::new(&self.catalog, backend, self.services.iter().cloned())
            .with_service_label(self.service_label.clone())
            .run()
            .await?;
        Ok(result)
    }

    pub fn render(
        &self,
        aggregate: &AggregateResult,
        formats: &[ReportFormat],
    ) -> Result<Vec<RenderedReport>, RenderError> {
        let renderer = Renderer::new(&self.catalog, self.layout.clone());
        formats
            .iter()
            .map(|&format| {
                let lines = renderer.render(aggregate, format, &self.sort_metric)?.collect();
                Ok(RenderedReport { format, lines })
            })
            .collect()
    }

    /// Query, aggregate and render every format in `formats`.
    pub async fn build(
        &self,
        backend: &dyn QueryBackend,
        formats: &[ReportFormat],
    ) -> Result<ReportOutput, ReportError> {
        let aggregate = self.aggregate(backend).await?;
        let reports = self.render(&aggregate, formats)?;
        info!(
            services = aggregate.len(),
            formats = reports.len(),
            catalog = %self.catalog_choice,
            "report rendered"
        );
        Ok(ReportOutput {
            services: aggregate.len(),
            reports,
        })
    }

    /// Wrap rendered output into a mail-ready notification dated `date`.
    pub fn notification(
        &self,
        output: &ReportOutput,
        date: NaiveDate,
    ) -> Result<Notification, ReportError> {
        let ctx = SubjectContext {
            date: date.format("%Y-%m-%d").to_string(),
            services: output.services,
            window_days: self.window_days,
            catalog: self.catalog_choice.to_string(),
        };
        let subject = self.templates.render(&self.subject, &ctx)?;

        Ok(output
            .reports
            .iter()
            .fold(Notification::new(subject), |n, report| {
                n.with_part(report.body_kind(), report.body())
            }))
    }

    pub async fn deliver(
        &self,
        notifier: &dyn Notifier,
        output: &ReportOutput,
    ) -> Result<(), ReportError> {
        let notification = self.notification(output, chrono::Local::now().date_naive())?;
        info!(
            channel = notifier.channel_name(),
            subject = %notification.subject,
            "delivering report"
        );
        notifier.send(&notification).await?;
        Ok(())
    }

    /// Build every configured format and deliver them as one notification.
    ///
    /// Nothing is sent when any query fails.
    pub async fn run(
        &self,
        backend: &dyn QueryBackend,
        notifier: &dyn Notifier,
    ) -> Result<ReportOutput, ReportError> {
        let output = self.build(backend, &self.formats).await?;
        self.deliver(notifier, &output).await?;
        Ok(output)
    }
}
