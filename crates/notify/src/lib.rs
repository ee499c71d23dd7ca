//! Report delivery.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - `EmailNotifier`, SMTP delivery of plain and/or HTML bodies via `lettre`
//! - Minijinja rendering of the report subject line

pub mod email;
pub mod templating;
pub mod traits;

pub use email::EmailNotifier;
pub use templating::{SubjectContext, TemplateRenderer};
pub use traits::{BodyKind, BodyPart, Notification, Notifier, NotifyError};
