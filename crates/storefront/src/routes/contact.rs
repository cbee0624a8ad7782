//! Contact form.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use greenleaf_core::Email;

use crate::error::{AppError, Result};
use crate::services::email::ContactMessage;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 100;
const MAX_SUBJECT_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 5_000;

/// Contact form body.
#[derive(Debug, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

impl ContactInput {
    fn into_message(self) -> std::result::Result<ContactMessage, String> {
        let name = self.name.trim().to_owned();
        let message = self.message.trim().to_owned();
        let email = Email::parse(self.email.trim()).map_err(|_| "Invalid email address".to_owned())?;
        let subject = self
            .subject
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Website enquiry".to_owned());

        if name.is_empty() || message.is_empty() {
            return Err("Name and message are required".to_owned());
        }
        if name.chars().count() > MAX_NAME_CHARS
            || subject.chars().count() > MAX_SUBJECT_CHARS
            || message.chars().count() > MAX_MESSAGE_CHARS
        {
            return Err("Message is too long".to_owned());
        }

        Ok(ContactMessage {
            name,
            email: email.to_string(),
            subject,
            message,
        })
    }
}

/// Forward a contact form message to the shop's inbox.
///
/// POST /api/contact
#[instrument(skip(state, input))]
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<StatusCode> {
    if !state.email().is_enabled() {
        return Err(AppError::ServiceUnavailable(
            "Contact form is not available".to_owned(),
        ));
    }

    let message = input.into_message().map_err(AppError::BadRequest)?;
    state.email().send_contact(state.pool(), &message).await?;
    tracing::info!(subject = %message.subject, "Contact message sent");

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str, message: &str) -> ContactInput {
        ContactInput {
            name: name.to_owned(),
            email: email.to_owned(),
            subject: None,
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_contact_message_defaults_subject() {
        let message = input(" Robin ", "robin@example.com", " Do you ship moss? ")
            .into_message()
            .unwrap();
        assert_eq!(message.name, "Robin");
        assert_eq!(message.subject, "Website enquiry");
        assert_eq!(message.message, "Do you ship moss?");
    }

    #[test]
    fn test_contact_message_validation() {
        assert!(input("", "robin@example.com", "hi").into_message().is_err());
        assert!(input("Robin", "not-an-email", "hi").into_message().is_err());
        assert!(input("Robin", "robin@example.com", "  ").into_message().is_err());
        assert!(
            input("Robin", "robin@example.com", &"x".repeat(MAX_MESSAGE_CHARS + 1))
                .into_message()
                .is_err()
        );
    }
}
