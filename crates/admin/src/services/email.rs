//! Test sends of stored email templates.
//!
//! The storefront sends the real messages; the back office only renders a
//! template with sample values so editors can see it in an inbox.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use greenleaf_core::Email;
use greenleaf_core::models::EmailTemplate;
use greenleaf_core::template::{Escape, TemplateVars, placeholders, render};

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP is not configured")]
    NotConfigured,

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// A template rendered with sample values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTemplate {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl RenderedTemplate {
    /// Render `template`, filling each placeholder with `[name]`.
    #[must_use]
    pub fn sample(template: &EmailTemplate) -> Self {
        let vars = sample_vars(template);
        Self {
            subject: render(&template.subject, &vars, Escape::None),
            text: render(&template.text_body, &vars, Escape::None),
            html: render(&template.html_body, &vars, Escape::Html),
        }
    }
}

fn sample_vars(template: &EmailTemplate) -> TemplateVars {
    [&template.subject, &template.text_body, &template.html_body]
        .into_iter()
        .flat_map(|part| placeholders(part))
        .map(|name| {
            let sample = format!("[{name}]");
            (name, sample)
        })
        .collect()
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl EmailService {
    /// `None` yields a service that refuses to send.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay can't be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self {
                mailer: None,
                from_address: String::new(),
            });
        };

        let builder = if matches!(config.smtp_host.as_str(), "localhost" | "127.0.0.1") {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        };
        let mut builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            mailer: Some(builder.build()),
            from_address: config.from_address.clone(),
        })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Render `template` with sample values and send it to `to`.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::NotConfigured` without SMTP, or the transport error.
    #[instrument(skip(self, template), fields(template = %template.key))]
    pub async fn send_test(
        &self,
        template: &EmailTemplate,
        to: &Email,
    ) -> Result<RenderedTemplate, EmailError> {
        let mailer = self.mailer.as_ref().ok_or(EmailError::NotConfigured)?;
        let rendered = RenderedTemplate::sample(template);

        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?;
        let to_mailbox: Mailbox = to
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(format!("[TEST] {}", rendered.subject))
            .multipart(MultiPart::alternative_plain_html(
                rendered.text.clone(),
                rendered.html.clone(),
            ))?;

        mailer.send(message).await?;
        info!(to = %to, "Sent template test email");
        Ok(rendered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use greenleaf_core::EmailTemplateId;

    use super::*;

    fn template() -> EmailTemplate {
        EmailTemplate {
            id: EmailTemplateId::new(1),
            key: "order_confirmation".to_owned(),
            subject: "Order {{ order_number }}".to_owned(),
            html_body: "<p>Hi {{customer_name}}</p>".to_owned(),
            text_body: "Hi {{ customer_name }}, total {{ total }}".to_owned(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sample_fills_every_placeholder() {
        let rendered = RenderedTemplate::sample(&template());
        assert_eq!(rendered.subject, "Order [order_number]");
        assert_eq!(rendered.text, "Hi [customer_name], total [total]");
        assert_eq!(rendered.html, "<p>Hi [customer_name]</p>");
    }

    #[tokio::test]
    async fn test_send_without_smtp_is_refused() {
        let service = EmailService::new(None).unwrap();
        assert!(!service.is_enabled());
        let to = Email::parse("editor@greenleaf.shop").unwrap();
        assert!(matches!(
            service.send_test(&template(), &to).await,
            Err(EmailError::NotConfigured)
        ));
    }
}
