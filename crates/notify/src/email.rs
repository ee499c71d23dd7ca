//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers a report as one email. A single body part is sent as a plain
//! single-part message; plain and HTML together go out as
//! `multipart/alternative` so mail clients pick the richest one they support.

use lettre::{
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use svcreport_core::MailConfig;

use crate::traits::{BodyKind, BodyPart, Notification, Notifier, NotifyError};

/// Sends reports as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
    /// Recipient mailboxes.
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP settings.
    ///
    /// - `smtp_host`: SMTP server hostname.
    /// - `smtp_port`: Optional port (defaults to 587).
    /// - `tls`: `None` or `Some(true)` enables STARTTLS; port 465 always uses
    ///   implicit TLS regardless of this flag.
    /// - `credentials`: `(username, password)`; unauthenticated when `None`.
    /// - `from`: Sender address (e.g. `"reports@example.com"` or `"Reports <reports@example.com>"`).
    /// - `to`: Recipient addresses.
    pub fn from_config(
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: Option<bool>,
        credentials: Option<(String, String)>,
        from: &str,
        to: &[String],
    ) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let to_mailboxes: Vec<Mailbox> = to
            .iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if to_mailboxes.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let port = smtp_port.unwrap_or(587);
        let use_tls = tls.unwrap_or(true);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from_mailbox,
            to: to_mailboxes,
        })
    }

    /// Build from the `MailConfig` section; fails when sender, recipients or host are missing.
    pub fn from_mail_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotifyError::Config("SMTP_HOST is not set".to_string()))?;
        let from = config
            .email_from
            .as_deref()
            .ok_or_else(|| NotifyError::Config("EMAIL_FROM is not set".to_string()))?;

        Self::from_config(
            host,
            Some(config.smtp_port),
            None,
            config.credentials(),
            from,
            &config.email_to,
        )
    }

    /// Assemble the message without sending it.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let mut message_builder = Message::builder().from(self.from.clone());

        for recipient in &self.to {
            message_builder = message_builder.to(recipient.clone());
        }
        let message_builder = message_builder.subject(&notification.subject);

        let message = match notification.parts.as_slice() {
            [] => {
                return Err(NotifyError::Config(
                    "notification has no body".to_string(),
                ))
            }
            [only] => message_builder.singlepart(single_part(only)),
            [first, rest @ ..] => {
                let multipart = rest.iter().fold(
                    MultiPart::alternative().singlepart(single_part(first)),
                    |mp, part| mp.singlepart(single_part(part)),
                );
                message_builder.multipart(multipart)
            }
        };

        message.map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

fn single_part(part: &BodyPart) -> SinglePart {
    match part.kind {
        BodyKind::Plain => SinglePart::plain(part.content.clone()),
        BodyKind::Html => SinglePart::html(part.content.clone()),
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send the report to all configured recipients.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = self.build_message(notification)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            subject = %notification.subject,
            recipients = self.to.len(),
            parts = notification.parts.len(),
            "report delivered"
        );

        Ok(())
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> EmailNotifier {
        EmailNotifier::from_config(
            "smtp.example.com",
            Some(587),
            Some(true),
            None,
            "Reports <reports@example.com>",
            &["ops@example.com".to_string(), "lead@example.com".to_string()],
        )
        .unwrap()
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn from_config_invalid_from_address() {
        let result = EmailNotifier::from_config(
            "smtp.example.com",
            None,
            None,
            None,
            "bad-address",
            &["admin@example.com".to_string()],
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Configuration error"), "got: {err}");
    }

    #[test]
    fn from_config_invalid_to_address() {
        let result = EmailNotifier::from_config(
            "smtp.example.com",
            None,
            None,
            None,
            "reports@example.com",
            &["not-valid".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn from_config_empty_recipients() {
        let result = EmailNotifier::from_config(
            "smtp.example.com",
            None,
            None,
            None,
            "reports@example.com",
            &[],
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least one recipient"), "got: {err}");
    }

    #[test]
    fn from_config_implicit_tls_and_plain_ports() {
        for (port, tls) in [(465, None), (25, Some(false))] {
            let notifier = EmailNotifier::from_config(
                "smtp.example.com",
                Some(port),
                tls,
                Some(("user".to_string(), "pass".to_string())),
                "reports@example.com",
                &["admin@example.com".to_string()],
            );
            assert!(notifier.is_ok(), "port {port}");
        }
    }

    #[test]
    fn from_mail_config_requires_host_and_sender() {
        let mut config = MailConfig {
            email_to: vec!["ops@example.com".to_string()],
            email_from: None,
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
        };
        let err = EmailNotifier::from_mail_config(&config).unwrap_err();
        assert!(err.to_string().contains("EMAIL_FROM"), "got: {err}");

        config.email_from = Some("reports@example.com".to_string());
        let notifier = EmailNotifier::from_mail_config(&config).unwrap();
        assert_eq!(notifier.channel_name(), "email");
    }

    #[test]
    fn single_body_is_not_multipart() {
        let n = Notification::new("Service request report")
            .with_part(BodyKind::Plain, "+---+\n| a |\n+---+");
        let text = formatted(&notifier().build_message(&n).unwrap());

        assert!(text.contains("Subject: Service request report"), "got: {text}");
        assert!(text.contains("text/plain"), "got: {text}");
        assert!(!text.contains("multipart/alternative"), "got: {text}");
    }

    #[test]
    fn plain_and_html_become_alternatives() {
        let n = Notification::new("Service request report")
            .with_part(BodyKind::Plain, "table")
            .with_part(BodyKind::Html, "<table></table>");
        let text = formatted(&notifier().build_message(&n).unwrap());

        assert!(text.contains("multipart/alternative"), "got: {text}");
        assert!(text.contains("text/plain"), "got: {text}");
        assert!(text.contains("text/html"), "got: {text}");
        assert!(text.contains("ops@example.com"), "got: {text}");
        assert!(text.contains("lead@example.com"), "got: {text}");
    }

    #[test]
    fn empty_notification_is_rejected() {
        let err = notifier()
            .build_message(&Notification::new("nothing"))
            .unwrap_err();
        assert!(err.to_string().contains("no body"), "got: {err}");
    }
}
