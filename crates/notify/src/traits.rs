//! Notifier trait definition and shared error types.

use serde::Serialize;

/// Errors that can occur during report delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Content type of one body alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyPart {
    pub kind: BodyKind,
    pub content: String,
}

/// A rendered report ready for delivery.
///
/// Several parts are alternatives of the same content, not attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub parts: Vec<BodyPart>,
}

impl Notification {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, kind: BodyKind, content: impl Into<String>) -> Self {
        self.parts.push(BodyPart {
            kind,
            content: content.into(),
        });
        self
    }

    pub fn part(&self, kind: BodyKind) -> Option<&BodyPart> {
        self.parts.iter().find(|p| p.kind == kind)
    }
}

/// Trait for delivery channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "email").
    fn channel_name(&self) -> &str;
}
