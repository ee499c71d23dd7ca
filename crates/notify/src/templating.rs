//! Minijinja rendering of report subject lines.
//!
//! Subjects come from configuration as arbitrary strings (not pre-registered),
//! so a fresh [`minijinja::Environment`] is created per render call.

use crate::traits::NotifyError;

/// Context data available to subject templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubjectContext {
    /// Report date, `YYYY-MM-DD`.
    pub date: String,
    /// Number of services with a complete row in the report.
    pub services: usize,
    /// Query window the catalog was built with.
    pub window_days: u32,
    /// Catalog name (`requests` or `slo`).
    pub catalog: String,
}

/// Renders subject templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env
    }

    /// Render a subject template.
    ///
    /// Only the first line of the output is kept and surrounding whitespace
    /// is trimmed; a header value must not carry line breaks.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &SubjectContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        let rendered = env
            .render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        Ok(rendered.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Validate that a template string parses without errors.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template has syntax errors.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> SubjectContext {
        SubjectContext {
            date: "2026-10-17".to_string(),
            services: 2,
            window_days: 30,
            catalog: "requests".to_string(),
        }
    }

    #[test]
    fn render_default_subject() {
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render("Service request report {{ date }}", &sample_context())
            .unwrap();
        assert_eq!(result, "Service request report 2026-10-17");
    }

    #[test]
    fn render_all_fields() {
        let renderer = TemplateRenderer::new();
        let template =
            "[{{ catalog | upper }}] {{ services }} services over {{ window_days }}d";
        let result = renderer.render(template, &sample_context()).unwrap();
        assert_eq!(result, "[REQUESTS] 2 services over 30d");
    }

    #[test]
    fn render_round_filter() {
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render("{{ (window_days / 7) | round(1) }} weeks", &sample_context())
            .unwrap();
        assert_eq!(result, "4.3 weeks");
    }

    #[test]
    fn render_keeps_first_line_only() {
        let renderer = TemplateRenderer::new();
        let result = renderer
            .render("  Report {{ date }}  \nBcc: someone@example.com", &sample_context())
            .unwrap();
        assert_eq!(result, "Report 2026-10-17");
    }

    #[test]
    fn render_conditional() {
        let renderer = TemplateRenderer::new();
        let mut ctx = sample_context();
        ctx.services = 0;

        let template = "{% if services == 0 %}Empty report{% else %}Report{% endif %} {{ date }}";
        assert_eq!(renderer.render(template, &ctx).unwrap(), "Empty report 2026-10-17");
    }

    #[test]
    fn invalid_template_produces_error() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("{{ unclosed", &sample_context());

        match result.unwrap_err() {
            NotifyError::Template(msg) => {
                assert!(!msg.is_empty(), "Error message should not be empty");
            }
            other => panic!("Expected Template error, got: {:?}", other),
        }
    }

    #[test]
    fn validate_valid_template() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("Report {{ date }}").is_ok());
    }

    #[test]
    fn validate_invalid_template() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("{% if %}").is_err());
    }
}
