//! Shopify webhook verification and processing.
//!
//! Every delivery is handled in one transaction that starts by claiming the
//! delivery id in `storefront.webhook_event`. A redelivery finds the claim and
//! is acknowledged without side effects; a failure rolls the claim back so
//! Shopify's retry runs the whole thing again.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::Sha256;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::{info, instrument, warn};

use greenleaf_core::models::Order;
use greenleaf_core::promo::normalize_code;
use greenleaf_core::webhook::{
    OrderPayload, RefundPayload, WebhookTopic, product_gid, variant_gid,
};
use greenleaf_core::{OrderStatus, UserId};

use crate::db::influencers::{self, Redemption};
use crate::db::orders::{self, NewOrder, NewOrderLine};
use crate::db::{RepositoryError, affiliates, donations, sales, users, webhooks};
use crate::services::email::{ConfirmationLine, DonationReceipt, EmailService, OrderConfirmation};

type HmacSha256 = Hmac<Sha256>;

/// Errors from webhook handling.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// HMAC header missing or wrong.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// A required `X-Shopify-*` header is absent.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    /// Body isn't the payload the topic promises.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for WebhookError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Check `X-Shopify-Hmac-Sha256` against the raw body.
///
/// The header is the base64 HMAC-SHA256 of the body keyed with the app's
/// webhook secret. Comparison is constant time.
#[must_use]
pub fn verify_signature(secret: &[u8], body: &[u8], header: &str) -> bool {
    let Ok(expected) = STANDARD.decode(header.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// A verified delivery.
#[derive(Debug)]
pub struct WebhookDelivery<'a> {
    pub webhook_id: &'a str,
    pub topic: WebhookTopic,
    pub shop_domain: Option<&'a str>,
    pub body: &'a [u8],
}

/// What processing did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed,
    /// Delivery id seen before.
    Duplicate,
    /// Topic not handled.
    Ignored,
    /// Refers to an order this store never recorded.
    UnknownOrder,
}

/// Emails to send once the transaction commits.
#[derive(Debug, Default)]
struct PostCommit {
    confirmation: Option<(String, OrderConfirmation)>,
    receipt: Option<(String, DonationReceipt)>,
}

/// Applies deliveries to the database.
pub struct WebhookProcessor<'a> {
    pool: &'a PgPool,
    email: &'a EmailService,
}

impl<'a> WebhookProcessor<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self { pool, email }
    }

    /// Process one delivery.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Payload` for bodies that don't parse and
    /// `WebhookError::Repository` when the transaction fails; both leave no
    /// trace in the database.
    #[instrument(skip(self, delivery), fields(topic = %delivery.topic, webhook_id = delivery.webhook_id))]
    pub async fn process(&self, delivery: &WebhookDelivery<'_>) -> Result<WebhookOutcome, WebhookError> {
        if let WebhookTopic::Unsupported(topic) = &delivery.topic {
            info!(topic, "Ignoring unsupported webhook topic");
            return Ok(WebhookOutcome::Ignored);
        }

        let mut tx = self.pool.begin().await?;

        if !webhooks::claim_delivery(
            &mut *tx,
            delivery.webhook_id,
            delivery.topic.as_str(),
            delivery.shop_domain,
        )
        .await?
        {
            tx.rollback().await?;
            return Ok(WebhookOutcome::Duplicate);
        }

        let (outcome, post_commit) = match &delivery.topic {
            WebhookTopic::OrdersPaid => {
                let payload: OrderPayload = serde_json::from_slice(delivery.body)?;
                handle_paid(&mut *tx, &payload).await?
            }
            WebhookTopic::OrdersFulfilled => {
                let payload: OrderPayload = serde_json::from_slice(delivery.body)?;
                (handle_fulfilled(&mut *tx, &payload).await?, PostCommit::default())
            }
            WebhookTopic::RefundsCreate => {
                let payload: RefundPayload = serde_json::from_slice(delivery.body)?;
                (handle_refund(&mut *tx, &payload).await?, PostCommit::default())
            }
            WebhookTopic::Unsupported(_) => (WebhookOutcome::Ignored, PostCommit::default()),
        };

        tx.commit().await?;

        self.send_post_commit(post_commit).await;
        Ok(outcome)
    }

    /// Email failures never fail the webhook; the order is already recorded.
    async fn send_post_commit(&self, post_commit: PostCommit) {
        if let Some((to, confirmation)) = post_commit.confirmation
            && let Err(e) = self.email.send(self.pool, &to, &confirmation).await
        {
            warn!(error = %e, order = %confirmation.order_number, "Failed to send order confirmation");
        }
        if let Some((to, receipt)) = post_commit.receipt
            && let Err(e) = self.email.send(self.pool, &to, &receipt).await
        {
            warn!(error = %e, order = %receipt.order_number, "Failed to send donation receipt");
        }
    }
}

/// `orders/paid`: record the order and everything that hangs off it.
async fn handle_paid(
    conn: &mut PgConnection,
    payload: &OrderPayload,
) -> Result<(WebhookOutcome, PostCommit), WebhookError> {
    let email = payload.contact_email();

    let user_id = match (payload.member_id(), email) {
        (Some(id), Some(email)) => users::member_with_email(conn, UserId::new(id), email).await?,
        _ => None,
    };

    let affiliate_code = payload.affiliate_code().and_then(|c| normalize_code(c).ok());
    let influencer_code = payload.influencer_code().and_then(|c| normalize_code(c).ok());

    let new_order = NewOrder {
        shopify_order_id: payload.id,
        order_number: &payload.name,
        email,
        user_id,
        currency_code: &payload.currency,
        subtotal: payload.subtotal_price,
        total: payload.total_price,
        affiliate_code: affiliate_code.as_deref(),
        influencer_code: influencer_code.as_deref(),
    };

    let Some(order) = orders::insert_order(conn, &new_order).await? else {
        info!(shopify_order_id = payload.id, "Order already recorded, skipping side effects");
        return Ok((WebhookOutcome::Processed, PostCommit::default()));
    };

    let lines: Vec<NewOrderLine<'_>> = payload
        .merchandise_lines()
        .map(|item| NewOrderLine {
            shopify_line_id: item.id,
            product_id: item.product_id.map(product_gid),
            variant_id: item.variant_id.map(variant_gid),
            title: &item.title,
            quantity: item.quantity,
            price: item.price,
        })
        .collect();
    orders::insert_lines(conn, order.id, &lines).await?;

    for item in payload.merchandise_lines() {
        if let Some(product_id) = item.product_id
            && item.quantity > 0
        {
            sales::record_sale(
                conn,
                &product_gid(product_id),
                &item.title,
                i64::from(item.quantity),
                item.line_total(),
            )
            .await?;
        }
    }

    let commissionable = payload.commissionable_subtotal();

    if let Some(code) = &affiliate_code {
        match affiliates::get_active_by_code(conn, code).await? {
            Some(affiliate) => {
                if let Some(commission) =
                    affiliates::insert_commission(conn, &affiliate, order.id, commissionable).await?
                {
                    info!(affiliate_id = %affiliate.id, amount = %commission.amount, "Recorded affiliate commission");
                }
            }
            None => warn!(code, "Order carries unknown or inactive affiliate code"),
        }
    }

    if let Some(code) = &influencer_code
        && let Some(influencer) = influencers::get_by_code(conn, code).await?
    {
        match influencers::redeem(conn, influencer.id, order.id, commissionable).await? {
            Redemption::Counted => info!(influencer_id = %influencer.id, "Recorded influencer redemption"),
            Redemption::OverLimit => warn!(
                influencer_id = %influencer.id,
                "Influencer code redeemed past its usage limit"
            ),
            Redemption::Duplicate => {}
        }
    }

    let donor_name = payload
        .customer
        .as_ref()
        .and_then(|c| c.first_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let donation = match payload.donation_amount() {
        Some(amount) => {
            donations::insert_for_order(
                conn,
                order.id,
                amount,
                &payload.currency,
                payload.donation_source(),
                donor_name,
            )
            .await?
        }
        None => None,
    };

    Ok((
        WebhookOutcome::Processed,
        post_commit_for(&order, payload, donor_name, donation.map(|d| d.amount)),
    ))
}

fn post_commit_for(
    order: &Order,
    payload: &OrderPayload,
    donor_name: Option<&str>,
    donation: Option<Decimal>,
) -> PostCommit {
    let Some(to) = payload.contact_email() else {
        return PostCommit::default();
    };

    let confirmation = OrderConfirmation {
        customer_name: donor_name.map(str::to_owned),
        order_number: order.order_number.clone(),
        currency: order.currency_code.clone(),
        lines: payload
            .merchandise_lines()
            .map(|item| ConfirmationLine {
                title: item.title.clone(),
                quantity: item.quantity,
                total: item.line_total(),
            })
            .collect(),
        donation,
        total: order.total,
    };

    let receipt = donation.map(|amount| {
        (
            to.to_owned(),
            DonationReceipt {
                donor_name: donor_name.map(str::to_owned),
                amount,
                currency: order.currency_code.clone(),
                order_number: order.order_number.clone(),
            },
        )
    });

    PostCommit {
        confirmation: Some((to.to_owned(), confirmation)),
        receipt,
    }
}

/// `orders/fulfilled`: mark shipped and approve pending commissions.
async fn handle_fulfilled(
    conn: &mut PgConnection,
    payload: &OrderPayload,
) -> Result<WebhookOutcome, WebhookError> {
    let Some(order) = orders::lock_by_shopify_id(conn, payload.id).await? else {
        warn!(shopify_order_id = payload.id, "Fulfillment for unknown order");
        return Ok(WebhookOutcome::UnknownOrder);
    };

    if order.status == OrderStatus::Paid {
        orders::set_status(conn, order.id, OrderStatus::Fulfilled).await?;
    }
    let approved = affiliates::approve_for_order(conn, order.id).await?;
    info!(order_id = %order.id, approved, "Order fulfilled");

    Ok(WebhookOutcome::Processed)
}

/// Status after refunding `refunded_total` of `total` in all.
#[must_use]
pub fn refund_status(total: Decimal, refunded_total: Decimal) -> OrderStatus {
    if refunded_total >= total {
        OrderStatus::Refunded
    } else {
        OrderStatus::PartiallyRefunded
    }
}

/// `refunds/create`: adjust refund totals, sales counters and commissions.
async fn handle_refund(
    conn: &mut PgConnection,
    payload: &RefundPayload,
) -> Result<WebhookOutcome, WebhookError> {
    let Some(order) = orders::lock_by_shopify_id(conn, payload.order_id).await? else {
        warn!(shopify_order_id = payload.order_id, "Refund for unknown order");
        return Ok(WebhookOutcome::UnknownOrder);
    };

    // Only stored lines count; the donation line is never stored.
    let mut merchandise = Decimal::ZERO;
    for refunded in &payload.refund_line_items {
        if refunded.quantity <= 0 {
            continue;
        }
        let Some(line) = orders::get_line(conn, order.id, refunded.line_item_id).await? else {
            continue;
        };
        let revenue = refunded.refunded_subtotal(line.price);
        merchandise += revenue;
        if let Some(product_id) = line.product_id.as_deref() {
            sales::record_return(conn, product_id, i64::from(refunded.quantity), revenue).await?;
        }
    }

    let amount = payload.refunded_amount();
    if amount > Decimal::ZERO {
        let refunded_total = order.refunded_total + amount;
        let status = refund_status(order.total, refunded_total);
        orders::record_refund(conn, order.id, refunded_total, status).await?;

        if status == OrderStatus::Refunded {
            let reversed = affiliates::reverse_unpaid_for_order(conn, order.id).await?;
            info!(order_id = %order.id, reversed, "Order fully refunded");
            return Ok(WebhookOutcome::Processed);
        }
        info!(order_id = %order.id, %refunded_total, "Order partially refunded");
    }

    if merchandise > Decimal::ZERO {
        let reduced = affiliates::reduce_unpaid_for_order(conn, order.id, merchandise).await?;
        info!(order_id = %order.id, %merchandise, reduced, "Reduced commissions for returned items");
    }

    Ok(WebhookOutcome::Processed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use greenleaf_core::OrderId;
    use greenleaf_core::webhook::{DONATION_LINE_PROPERTY, NoteAttribute, OrderLineItem};

    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let body = br#"{"id":1}"#;
        let header = sign(b"shhh", body);
        assert!(verify_signature(b"shhh", body, &header));
        assert!(verify_signature(b"shhh", body, &format!(" {header}\n")));
    }

    #[test]
    fn test_verify_signature_rejects_tampering() {
        let header = sign(b"shhh", br#"{"id":1}"#);
        assert!(!verify_signature(b"shhh", br#"{"id":2}"#, &header));
        assert!(!verify_signature(b"other", br#"{"id":1}"#, &header));
        assert!(!verify_signature(b"shhh", br#"{"id":1}"#, "not base64!"));
        assert!(!verify_signature(b"shhh", br#"{"id":1}"#, ""));
    }

    #[test]
    fn test_refund_status() {
        let total = Decimal::from(50);
        assert_eq!(refund_status(total, Decimal::from(10)), OrderStatus::PartiallyRefunded);
        assert_eq!(refund_status(total, total), OrderStatus::Refunded);
        assert_eq!(refund_status(total, Decimal::from(60)), OrderStatus::Refunded);
    }

    fn order() -> Order {
        Order {
            id: OrderId::new(9),
            shopify_order_id: 1001,
            order_number: "#1001".to_owned(),
            email: Some("robin@example.com".to_owned()),
            user_id: None,
            currency_code: "USD".to_owned(),
            subtotal: Decimal::from(40),
            total: Decimal::from(45),
            refunded_total: Decimal::ZERO,
            status: OrderStatus::Paid,
            affiliate_code: None,
            influencer_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payload(email: Option<&str>) -> OrderPayload {
        OrderPayload {
            id: 1001,
            name: "#1001".to_owned(),
            email: email.map(str::to_owned),
            currency: "USD".to_owned(),
            subtotal_price: Decimal::from(40),
            total_price: Decimal::from(45),
            total_discounts: None,
            discount_codes: Vec::new(),
            note_attributes: Vec::new(),
            line_items: vec![OrderLineItem {
                id: 1,
                product_id: Some(7),
                variant_id: Some(70),
                title: "Fern".to_owned(),
                quantity: 2,
                price: Decimal::from(20),
                properties: Vec::new(),
            }],
            customer: None,
        }
    }

    #[test]
    fn test_post_commit_emails() {
        let post = post_commit_for(
            &order(),
            &payload(Some("robin@example.com")),
            Some("Robin"),
            Some(Decimal::from(5)),
        );
        let (to, confirmation) = post.confirmation.unwrap();
        assert_eq!(to, "robin@example.com");
        assert_eq!(confirmation.lines.first().unwrap().total, Decimal::from(40));
        assert_eq!(post.receipt.unwrap().1.amount, Decimal::from(5));

        let post = post_commit_for(&order(), &payload(None), None, None);
        assert!(post.confirmation.is_none());
        assert!(post.receipt.is_none());
    }

    #[test]
    fn test_confirmation_lists_donation_once() {
        let mut payload = payload(Some("robin@example.com"));
        payload.line_items.push(OrderLineItem {
            id: 2,
            product_id: Some(8),
            variant_id: Some(80),
            title: "Donation".to_owned(),
            quantity: 500,
            price: Decimal::new(1, 2),
            properties: vec![NoteAttribute {
                name: DONATION_LINE_PROPERTY.to_owned(),
                value: Some("fixed".to_owned()),
            }],
        });
        let donation = payload.donation_amount();
        assert_eq!(donation, Some(Decimal::from(5)));

        let post = post_commit_for(&order(), &payload, None, donation);
        let (_, confirmation) = post.confirmation.unwrap();
        assert_eq!(confirmation.lines.len(), 1);
        assert_eq!(confirmation.lines.first().unwrap().title, "Fern");
        assert_eq!(confirmation.donation, Some(Decimal::from(5)));
    }
}
