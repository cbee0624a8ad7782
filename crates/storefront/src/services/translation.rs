//! Translation on demand.
//!
//! Product copy and reviews are translated through an OpenAI-compatible
//! chat-completions gateway. Results are cached for a day keyed by target
//! language and a SHA-256 of the source text.

use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::TranslationConfig;

/// Longest text accepted for translation.
pub const MAX_TEXT_CHARS: usize = 5_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the translation gateway.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Text empty or too long.
    #[error("text must be between 1 and 5000 characters")]
    InvalidText,

    /// Not a plausible BCP 47 language tag.
    #[error("invalid language: {0}")]
    InvalidLanguage(String),

    /// The API key can't be sent as a header.
    #[error("invalid API key")]
    InvalidApiKey,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an error or no content.
    #[error("gateway error: {0}")]
    Gateway(String),
}

/// Client for the translation gateway.
#[derive(Clone)]
pub struct TranslationService {
    client: reqwest::Client,
    api_url: String,
    model: String,
    cache: Cache<(String, String), String>,
}

impl TranslationService {
    /// Create a new translation service.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key isn't a valid header value or the HTTP
    /// client can't be built.
    pub fn new(config: &TranslationConfig) -> Result<Self, TranslationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| TranslationError::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(24 * 60 * 60))
            .build();

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            cache,
        })
    }

    /// Translate `text` into `target_language`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input or a failed gateway call.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let text = validate_text(text)?;
        let language = validate_language(target_language)?;

        let key = (language.clone(), text_hash(text));
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Cache hit for translation");
            return Ok(cached);
        }

        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(&language),
                },
                ChatMessage {
                    role: "user",
                    content: text.to_owned(),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Gateway(format!("{status}: {body}")));
        }

        let response: ChatResponse = response.json().await?;
        let translated = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TranslationError::Gateway("empty completion".to_owned()))?;

        self.cache.insert(key, translated.clone()).await;
        Ok(translated)
    }
}

fn validate_text(text: &str) -> Result<&str, TranslationError> {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
        return Err(TranslationError::InvalidText);
    }
    Ok(text)
}

/// Accept tags like `fr`, `pt-BR`, `zh-Hant`.
fn validate_language(language: &str) -> Result<String, TranslationError> {
    let language = language.trim();
    let valid = (2..=16).contains(&language.len())
        && language
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return Err(TranslationError::InvalidLanguage(language.to_owned()));
    }
    Ok(language.to_owned())
}

fn text_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn system_prompt(language: &str) -> String {
    format!(
        "Translate the user's message into the language with BCP 47 tag \"{language}\". \
         Keep HTML tags, product names and numbers unchanged. \
         Reply with the translation only."
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("  hola  ").unwrap(), "hola");
        assert!(validate_text("   ").is_err());
        assert!(validate_text(&"a".repeat(MAX_TEXT_CHARS + 1)).is_err());
        assert!(validate_text(&"é".repeat(MAX_TEXT_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("fr").unwrap(), "fr");
        assert_eq!(validate_language(" pt-BR ").unwrap(), "pt-BR");
        assert!(validate_language("f").is_err());
        assert!(validate_language("en--US").is_err());
        assert!(validate_language("en US").is_err());
        assert!(validate_language("\"; ignore").is_err());
    }

    #[test]
    fn test_text_hash_is_stable() {
        assert_eq!(text_hash("fern"), text_hash("fern"));
        assert_ne!(text_hash("fern"), text_hash("moss"));
    }

    #[test]
    fn test_chat_response_parses() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Bonjour "}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices.first().unwrap().message.content, " Bonjour ");
    }
}
