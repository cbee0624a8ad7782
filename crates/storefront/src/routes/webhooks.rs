//! Shopify webhook receiver.
//!
//! The body is taken as raw bytes so the HMAC is computed over exactly what
//! Shopify signed.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{info, instrument, warn};

use greenleaf_core::webhook::WebhookTopic;

use crate::error::Result;
use crate::services::webhooks::{
    WebhookDelivery, WebhookError, WebhookOutcome, WebhookProcessor, verify_signature,
};
use crate::state::AppState;

const TOPIC_HEADER: &str = "x-shopify-topic";
const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";
const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub outcome: WebhookOutcome,
}

/// Receive a Shopify webhook.
///
/// POST /webhooks/shopify
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn shopify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = header(&headers, HMAC_HEADER)?;
    let secret = state.config().shopify.webhook_secret.expose_secret();
    if !verify_signature(secret.as_bytes(), &body, signature) {
        warn!("Rejected webhook with bad signature");
        return Err(WebhookError::InvalidSignature.into());
    }

    let delivery = WebhookDelivery {
        webhook_id: header(&headers, WEBHOOK_ID_HEADER)?,
        topic: WebhookTopic::parse(header(&headers, TOPIC_HEADER)?),
        shop_domain: header(&headers, SHOP_DOMAIN_HEADER).ok(),
        body: &body,
    };

    let outcome = WebhookProcessor::new(state.pool(), state.email())
        .process(&delivery)
        .await?;
    info!(topic = %delivery.topic, ?outcome, "Webhook handled");

    Ok(Json(WebhookAck { outcome }))
}

fn header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> std::result::Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Shopify-Topic", HeaderValue::from_static(" orders/paid "));
        assert_eq!(header(&headers, TOPIC_HEADER).unwrap(), "orders/paid");
    }

    #[test]
    fn test_missing_or_blank_header() {
        let mut headers = HeaderMap::new();
        headers.insert(WEBHOOK_ID_HEADER, HeaderValue::from_static("  "));
        assert!(matches!(
            header(&headers, WEBHOOK_ID_HEADER),
            Err(WebhookError::MissingHeader(WEBHOOK_ID_HEADER))
        ));
        assert!(header(&headers, HMAC_HEADER).is_err());
    }

    #[test]
    fn test_ack_serializes_outcome() {
        let ack = WebhookAck {
            outcome: WebhookOutcome::UnknownOrder,
        };
        assert_eq!(
            serde_json::to_string(&ack).unwrap(),
            r#"{"outcome":"unknown_order"}"#
        );
    }
}
