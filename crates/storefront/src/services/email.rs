//! Transactional email.
//!
//! Each message looks for an editable template in `storefront.email_template`
//! first and renders its `{{ placeholders }}`; when no row exists the built-in
//! Askama templates are used instead. Without SMTP configuration messages are
//! rendered, logged and dropped.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use greenleaf_core::template::{Escape, TemplateVars, render};

use crate::config::EmailConfig;
use crate::db::EmailTemplateRepository;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A message that can come from a stored template or a built-in one.
pub trait TransactionalEmail {
    /// `email_template.key` of the editable version.
    const KEY: &'static str;

    /// Values for the stored template's placeholders.
    fn vars(&self) -> TemplateVars;

    /// Built-in rendering used when no stored template exists.
    ///
    /// # Errors
    ///
    /// Returns an Askama error if rendering fails.
    fn fallback(&self) -> Result<RenderedEmail, askama::Error>;
}

/// One line of an order confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub title: String,
    pub quantity: i32,
    pub total: Decimal,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: Option<&'a str>,
    order_number: &'a str,
    lines: &'a [ConfirmationLine],
    donation: Option<Decimal>,
    total: Decimal,
    currency: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: Option<&'a str>,
    order_number: &'a str,
    lines: &'a [ConfirmationLine],
    donation: Option<Decimal>,
    total: Decimal,
    currency: &'a str,
}

/// Sent after `orders/paid` is processed.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub customer_name: Option<String>,
    pub order_number: String,
    pub currency: String,
    pub lines: Vec<ConfirmationLine>,
    pub donation: Option<Decimal>,
    pub total: Decimal,
}

impl TransactionalEmail for OrderConfirmation {
    const KEY: &'static str = "order_confirmation";

    fn vars(&self) -> TemplateVars {
        let items = self
            .lines
            .iter()
            .map(|line| format!("{} x {} ({} {})", line.quantity, line.title, line.total, self.currency))
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = TemplateVars::new();
        vars.insert(
            "customer_name".into(),
            self.customer_name.clone().unwrap_or_default(),
        );
        vars.insert("order_number".into(), self.order_number.clone());
        vars.insert("currency".into(), self.currency.clone());
        vars.insert("items".into(), items);
        vars.insert(
            "donation".into(),
            self.donation.map(|d| d.to_string()).unwrap_or_default(),
        );
        vars.insert("total".into(), self.total.to_string());
        vars
    }

    fn fallback(&self) -> Result<RenderedEmail, askama::Error> {
        let customer_name = self.customer_name.as_deref();
        let html = OrderConfirmationHtml {
            customer_name,
            order_number: &self.order_number,
            lines: &self.lines,
            donation: self.donation,
            total: self.total,
            currency: &self.currency,
        }
        .render()?;
        let text = OrderConfirmationText {
            customer_name,
            order_number: &self.order_number,
            lines: &self.lines,
            donation: self.donation,
            total: self.total,
            currency: &self.currency,
        }
        .render()?;

        Ok(RenderedEmail {
            subject: format!("Your Greenleaf order {}", self.order_number),
            text,
            html,
        })
    }
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    reset_url: &'a str,
}

/// Link to set a new password.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub reset_url: String,
}

impl TransactionalEmail for PasswordReset {
    const KEY: &'static str = "password_reset";

    fn vars(&self) -> TemplateVars {
        TemplateVars::from([("reset_url".to_owned(), self.reset_url.clone())])
    }

    fn fallback(&self) -> Result<RenderedEmail, askama::Error> {
        Ok(RenderedEmail {
            subject: "Reset your Greenleaf password".to_owned(),
            text: PasswordResetText {
                reset_url: &self.reset_url,
            }
            .render()?,
            html: PasswordResetHtml {
                reset_url: &self.reset_url,
            }
            .render()?,
        })
    }
}

#[derive(Template)]
#[template(path = "email/donation_receipt.html")]
struct DonationReceiptHtml<'a> {
    donor_name: Option<&'a str>,
    amount: Decimal,
    currency: &'a str,
    order_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/donation_receipt.txt")]
struct DonationReceiptText<'a> {
    donor_name: Option<&'a str>,
    amount: Decimal,
    currency: &'a str,
    order_number: &'a str,
}

/// Receipt for a donation made at checkout.
#[derive(Debug, Clone)]
pub struct DonationReceipt {
    pub donor_name: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub order_number: String,
}

impl TransactionalEmail for DonationReceipt {
    const KEY: &'static str = "donation_receipt";

    fn vars(&self) -> TemplateVars {
        TemplateVars::from([
            (
                "donor_name".to_owned(),
                self.donor_name.clone().unwrap_or_default(),
            ),
            ("amount".to_owned(), self.amount.to_string()),
            ("currency".to_owned(), self.currency.clone()),
            ("order_number".to_owned(), self.order_number.clone()),
        ])
    }

    fn fallback(&self) -> Result<RenderedEmail, askama::Error> {
        let donor_name = self.donor_name.as_deref();
        Ok(RenderedEmail {
            subject: "Thank you for your donation".to_owned(),
            text: DonationReceiptText {
                donor_name,
                amount: self.amount,
                currency: &self.currency,
                order_number: &self.order_number,
            }
            .render()?,
            html: DonationReceiptHtml {
                donor_name,
                amount: self.amount,
                currency: &self.currency,
                order_number: &self.order_number,
            }
            .render()?,
        })
    }
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactText<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// Contact form submission, delivered to the store's contact address.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl TransactionalEmail for ContactMessage {
    const KEY: &'static str = "contact";

    fn vars(&self) -> TemplateVars {
        TemplateVars::from([
            ("name".to_owned(), self.name.clone()),
            ("email".to_owned(), self.email.clone()),
            ("subject".to_owned(), self.subject.clone()),
            ("message".to_owned(), self.message.clone()),
        ])
    }

    fn fallback(&self) -> Result<RenderedEmail, askama::Error> {
        Ok(RenderedEmail {
            subject: format!("[Contact] {}", self.subject),
            text: ContactText {
                name: &self.name,
                email: &self.email,
                subject: &self.subject,
                message: &self.message,
            }
            .render()?,
            html: ContactHtml {
                name: &self.name,
                email: &self.email,
                subject: &self.subject,
                message: &self.message,
            }
            .render()?,
        })
    }
}

/// Render a stored template with `vars`.
#[must_use]
pub fn render_stored(
    subject: &str,
    text_body: &str,
    html_body: &str,
    vars: &TemplateVars,
) -> RenderedEmail {
    RenderedEmail {
        subject: render(subject, vars, Escape::None),
        text: render(text_body, vars, Escape::None),
        html: render(html_body, vars, Escape::Html),
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    contact_address: Option<String>,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `None` yields a service that renders and logs but never sends.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay can't be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self {
                mailer: None,
                from_address: "Greenleaf <no-reply@localhost>".to_owned(),
                contact_address: None,
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
            contact_address: Some(config.contact_address.clone()),
        })
    }

    /// Whether messages are actually delivered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Render `email`, preferring the stored template.
    ///
    /// A database failure while looking up the template is logged and the
    /// built-in version is used.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if the built-in template fails.
    pub async fn render<E: TransactionalEmail>(
        &self,
        pool: &PgPool,
        email: &E,
    ) -> Result<RenderedEmail, EmailError> {
        match EmailTemplateRepository::new(pool).get_by_key(E::KEY).await {
            Ok(Some(stored)) => Ok(render_stored(
                &stored.subject,
                &stored.text_body,
                &stored.html_body,
                &email.vars(),
            )),
            Ok(None) => Ok(email.fallback()?),
            Err(e) => {
                warn!(key = E::KEY, error = %e, "Email template lookup failed, using built-in");
                Ok(email.fallback()?)
            }
        }
    }

    /// Render and send `email` to `to`.
    ///
    /// # Errors
    ///
    /// Returns error if rendering, building, or sending the message fails.
    #[instrument(skip(self, pool, email), fields(key = E::KEY))]
    pub async fn send<E: TransactionalEmail>(
        &self,
        pool: &PgPool,
        to: &str,
        email: &E,
    ) -> Result<(), EmailError> {
        let rendered = self.render(pool, email).await?;
        self.send_rendered(to, None, &rendered).await
    }

    /// Forward a contact form message to the store.
    ///
    /// # Errors
    ///
    /// Returns error if rendering, building, or sending the message fails.
    pub async fn send_contact(&self, pool: &PgPool, message: &ContactMessage) -> Result<(), EmailError> {
        let Some(to) = self.contact_address.clone() else {
            info!(from = %message.email, "SMTP not configured, dropping contact message");
            return Ok(());
        };
        let rendered = self.render(pool, message).await?;
        self.send_rendered(&to, Some(&message.email), &rendered).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_rendered(
        &self,
        to: &str,
        reply_to: Option<&str>,
        rendered: &RenderedEmail,
    ) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            info!(to = %to, subject = %rendered.subject, "SMTP not configured, email not sent");
            return Ok(());
        };

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from_address)?)
            .to(parse_mailbox(to)?)
            .subject(&rendered.subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        let email = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(rendered.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(rendered.html.clone()),
                ),
        )?;

        mailer.send(email).await?;

        info!(to = %to, subject = %rendered.subject, "Email sent successfully");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn confirmation() -> OrderConfirmation {
        OrderConfirmation {
            customer_name: Some("Robin".to_owned()),
            order_number: "#1001".to_owned(),
            currency: "USD".to_owned(),
            lines: vec![ConfirmationLine {
                title: "Fern <Large>".to_owned(),
                quantity: 2,
                total: Decimal::new(4000, 2),
            }],
            donation: Some(Decimal::from(5)),
            total: Decimal::new(4500, 2),
        }
    }

    #[test]
    fn test_order_confirmation_fallback_escapes_html() {
        let email = confirmation().fallback().unwrap();
        assert_eq!(email.subject, "Your Greenleaf order #1001");
        assert!(email.html.contains("Fern &#60;Large&#62;"));
        assert!(email.text.contains("2 x Fern <Large>"));
        assert!(email.text.contains("Total: 45.00 USD"));
    }

    #[test]
    fn test_stored_template_uses_vars() {
        let vars = confirmation().vars();
        let email = render_stored(
            "Order {{ order_number }}",
            "Hi {{ customer_name }}\n{{ items }}",
            "<p>{{ items }}</p>",
            &vars,
        );
        assert_eq!(email.subject, "Order #1001");
        assert_eq!(email.text, "Hi Robin\n2 x Fern <Large> (40.00 USD)");
        assert_eq!(email.html, "<p>2 x Fern &#60;Large&#62; (40.00 USD)</p>");
    }

    #[test]
    fn test_password_reset_fallback_contains_link() {
        let email = PasswordReset {
            reset_url: "https://greenleaf.example/reset?token=abc".to_owned(),
        }
        .fallback()
        .unwrap();
        assert!(email.text.contains("https://greenleaf.example/reset?token=abc"));
        assert!(email.html.contains("one hour"));
    }

    #[test]
    fn test_disabled_service() {
        let service = EmailService::new(None).unwrap();
        assert!(!service.is_enabled());
    }

    #[test]
    fn test_parse_mailbox() {
        assert!(parse_mailbox("Greenleaf <hello@greenleaf.example>").is_ok());
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
