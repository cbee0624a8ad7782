//! Shopify webhook topics and payloads.
//!
//! Only the fields the order pipeline reads are modeled; Shopify sends far
//! more and unknown fields are ignored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::DonationSource;

/// Line property marking the donation line; the value is the
/// [`DonationSource`] (`round_up` or `fixed`).
pub const DONATION_LINE_PROPERTY: &str = "_donation";
/// Cart attribute carrying the affiliate referral code.
pub const AFFILIATE_ATTRIBUTE: &str = "affiliate_code";
/// Cart attribute carrying the influencer code.
pub const INFLUENCER_ATTRIBUTE: &str = "influencer_code";
/// Cart attribute carrying the storefront user id of a signed-in member.
pub const MEMBER_ATTRIBUTE: &str = "member_id";
/// Cart attribute carrying the discount computed by the storefront.
pub const STOREFRONT_DISCOUNT_ATTRIBUTE: &str = "storefront_discount";

/// Topics the receiver acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    OrdersPaid,
    OrdersFulfilled,
    RefundsCreate,
    /// Acknowledged and ignored.
    Unsupported(String),
}

impl WebhookTopic {
    /// Parse the `X-Shopify-Topic` header value.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        match header.trim() {
            "orders/paid" => Self::OrdersPaid,
            "orders/fulfilled" => Self::OrdersFulfilled,
            "refunds/create" => Self::RefundsCreate,
            other => Self::Unsupported(other.to_owned()),
        }
    }

    /// The header value for this topic.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrdersPaid => "orders/paid",
            Self::OrdersFulfilled => "orders/fulfilled",
            Self::RefundsCreate => "refunds/create",
            Self::Unsupported(topic) => topic,
        }
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shopify's numeric product id as a Storefront API GID.
#[must_use]
pub fn product_gid(id: i64) -> String {
    format!("gid://shopify/Product/{id}")
}

/// Shopify's numeric variant id as a Storefront API GID.
#[must_use]
pub fn variant_gid(id: i64) -> String {
    format!("gid://shopify/ProductVariant/{id}")
}

/// A `name`/`value` pair copied from cart attributes onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAttribute {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A discount code used on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCodeUsage {
    pub code: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Customer block of an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// A line item of an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    /// Absent for custom items and deleted products.
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
    /// Cart line attributes, carried over by Shopify.
    #[serde(default)]
    pub properties: Vec<NoteAttribute>,
}

impl OrderLineItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Value of a line property, ignoring blanks.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        find_value(&self.properties, name)
    }

    /// True for the donation line added at checkout.
    #[must_use]
    pub fn is_donation(&self) -> bool {
        self.properties.iter().any(|p| p.name == DONATION_LINE_PROPERTY)
    }
}

fn find_value<'a>(pairs: &'a [NoteAttribute], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|pair| pair.name == name)
        .and_then(|pair| pair.value.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Body of `orders/paid` and `orders/fulfilled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub id: i64,
    /// Human order number, e.g. `#1001`.
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub currency: String,
    pub subtotal_price: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub total_discounts: Option<Decimal>,
    #[serde(default)]
    pub discount_codes: Vec<DiscountCodeUsage>,
    #[serde(default)]
    pub note_attributes: Vec<NoteAttribute>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
}

impl OrderPayload {
    /// Value of a note attribute, ignoring blanks.
    #[must_use]
    pub fn note_attribute(&self, name: &str) -> Option<&str> {
        find_value(&self.note_attributes, name)
    }

    /// Lines that are products rather than the donation.
    pub fn merchandise_lines(&self) -> impl Iterator<Item = &OrderLineItem> {
        self.line_items.iter().filter(|item| !item.is_donation())
    }

    /// Donation actually charged: the total of the donation lines.
    #[must_use]
    pub fn donation_amount(&self) -> Option<Decimal> {
        let charged: Decimal = self
            .line_items
            .iter()
            .filter(|item| item.is_donation())
            .map(OrderLineItem::line_total)
            .sum();
        (charged > Decimal::ZERO).then_some(charged)
    }

    /// How the donation was chosen; round-up unless marked fixed.
    #[must_use]
    pub fn donation_source(&self) -> DonationSource {
        let source = self
            .line_items
            .iter()
            .find_map(|item| item.property(DONATION_LINE_PROPERTY));
        match source {
            Some("fixed") => DonationSource::Fixed,
            _ => DonationSource::RoundUp,
        }
    }

    /// Affiliate referral code carried on the cart.
    #[must_use]
    pub fn affiliate_code(&self) -> Option<&str> {
        self.note_attribute(AFFILIATE_ATTRIBUTE)
    }

    /// Influencer code, from the cart attribute or else the first discount code.
    #[must_use]
    pub fn influencer_code(&self) -> Option<&str> {
        self.note_attribute(INFLUENCER_ATTRIBUTE).or_else(|| {
            self.discount_codes
                .first()
                .map(|usage| usage.code.trim())
                .filter(|code| !code.is_empty())
        })
    }

    /// Storefront member id recorded at checkout.
    #[must_use]
    pub fn member_id(&self) -> Option<i32> {
        self.note_attribute(MEMBER_ATTRIBUTE)
            .and_then(|value| value.parse().ok())
    }

    /// Best email for the order: the order's own, else the customer's.
    #[must_use]
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.customer.as_ref().and_then(|c| c.email.as_deref()))
            .filter(|email| !email.is_empty())
    }

    /// Subtotal without the donation line, which is not commissionable.
    ///
    /// Shopify's `subtotal_price` includes every line, the donation too.
    #[must_use]
    pub fn commissionable_subtotal(&self) -> Decimal {
        (self.subtotal_price - self.donation_amount().unwrap_or_default()).max(Decimal::ZERO)
    }
}

/// A refunded line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundLineItem {
    pub line_item_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub line_item: Option<OrderLineItem>,
}

/// A money movement on the refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundTransaction {
    pub amount: Decimal,
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `refunds/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPayload {
    pub id: i64,
    pub order_id: i64,
    #[serde(default)]
    pub refund_line_items: Vec<RefundLineItem>,
    #[serde(default)]
    pub transactions: Vec<RefundTransaction>,
}

impl RefundLineItem {
    /// Merchandise value returned on this line, at `unit_price` when Shopify
    /// leaves out the subtotal.
    #[must_use]
    pub fn refunded_subtotal(&self, unit_price: Decimal) -> Decimal {
        if self.quantity <= 0 {
            return Decimal::ZERO;
        }
        self.subtotal
            .unwrap_or_else(|| unit_price * Decimal::from(self.quantity))
            .max(Decimal::ZERO)
    }
}

impl RefundPayload {
    /// Money actually returned: successful `refund` transactions.
    #[must_use]
    pub fn refunded_amount(&self) -> Decimal {
        self.transactions
            .iter()
            .filter(|tx| tx.kind == "refund")
            .filter(|tx| tx.status.as_deref().is_none_or(|status| status == "success"))
            .map(|tx| tx.amount)
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r##"{
        "id": 820982911946154508,
        "name": "#1001",
        "email": "jon@example.com",
        "currency": "USD",
        "subtotal_price": "50.00",
        "total_price": "54.40",
        "total_discounts": "0.00",
        "discount_codes": [{"code": "LEAFY10", "amount": "4.56", "type": "percentage"}],
        "note_attributes": [
            {"name": "affiliate_code", "value": " GREENJO "},
            {"name": "member_id", "value": "12"}
        ],
        "line_items": [
            {"id": 1, "product_id": 632910392, "variant_id": 808950810, "title": "Fern", "quantity": 2, "price": "18.20", "sku": "F-1"},
            {"id": 2, "product_id": null, "variant_id": null, "title": "Gift wrap", "quantity": 1, "price": "9.20"},
            {"id": 3, "product_id": 4410, "variant_id": 44100, "title": "Donation", "quantity": 440, "price": "0.01",
             "properties": [{"name": "_donation", "value": "round_up"}]}
        ],
        "customer": {"id": 115310627314723954, "email": "jon@example.com", "first_name": "Jon"}
    }"##;

    #[test]
    fn test_topic_parse() {
        assert_eq!(WebhookTopic::parse("orders/paid"), WebhookTopic::OrdersPaid);
        assert_eq!(
            WebhookTopic::parse(" refunds/create "),
            WebhookTopic::RefundsCreate
        );
        assert_eq!(
            WebhookTopic::parse("products/update"),
            WebhookTopic::Unsupported("products/update".to_owned())
        );
        assert_eq!(WebhookTopic::OrdersFulfilled.to_string(), "orders/fulfilled");
    }

    #[test]
    fn test_order_payload_attributes() {
        let order: OrderPayload = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(order.donation_amount(), Some(Decimal::new(440, 2)));
        assert_eq!(order.donation_source(), DonationSource::RoundUp);
        assert_eq!(order.affiliate_code(), Some("GREENJO"));
        assert_eq!(order.influencer_code(), Some("LEAFY10"));
        assert_eq!(order.member_id(), Some(12));
        assert_eq!(order.contact_email(), Some("jon@example.com"));
        assert_eq!(order.line_items[0].line_total(), Decimal::new(3640, 2));
        assert_eq!(order.line_items[1].product_id, None);
    }

    #[test]
    fn test_donation_line_is_charged_but_not_commissionable() {
        let order: OrderPayload = serde_json::from_str(ORDER_JSON).unwrap();
        let merchandise: Decimal = order.merchandise_lines().map(OrderLineItem::line_total).sum();

        assert_eq!(merchandise, Decimal::new(4560, 2));
        assert_eq!(order.commissionable_subtotal(), merchandise);
        assert_eq!(order.merchandise_lines().count(), 2);
    }

    #[test]
    fn test_donation_attribute_without_line_is_not_a_donation() {
        let order: OrderPayload = serde_json::from_str(
            r##"{
                "id": 7, "name": "#1007", "currency": "USD",
                "subtotal_price": "50.00", "total_price": "59.99",
                "note_attributes": [{"name": "donation_amount", "value": "9.99"}],
                "line_items": [{"id": 1, "product_id": 5, "variant_id": 50, "title": "Moss", "quantity": 1, "price": "50.00"}]
            }"##,
        )
        .unwrap();

        assert_eq!(order.donation_amount(), None);
        assert_eq!(order.commissionable_subtotal(), Decimal::new(5000, 2));
    }

    #[test]
    fn test_fixed_donation_source() {
        let mut order: OrderPayload = serde_json::from_str(ORDER_JSON).unwrap();
        for item in &mut order.line_items {
            for property in &mut item.properties {
                property.value = Some("fixed".to_owned());
            }
        }
        assert_eq!(order.donation_source(), DonationSource::Fixed);
    }

    #[test]
    fn test_blank_attributes_are_ignored() {
        let mut order: OrderPayload = serde_json::from_str(ORDER_JSON).unwrap();
        order.note_attributes = vec![NoteAttribute {
            name: INFLUENCER_ATTRIBUTE.to_owned(),
            value: Some("  ".to_owned()),
        }];
        order.discount_codes.clear();
        assert_eq!(order.influencer_code(), None);
        assert_eq!(order.affiliate_code(), None);
    }

    #[test]
    fn test_refunded_amount_counts_successful_refunds() {
        let refund: RefundPayload = serde_json::from_str(
            r#"{
                "id": 1, "order_id": 2,
                "refund_line_items": [{"line_item_id": 1, "quantity": 1, "subtotal": "18.20"}],
                "transactions": [
                    {"amount": "18.20", "kind": "refund", "status": "success"},
                    {"amount": "5.00", "kind": "refund", "status": "failure"},
                    {"amount": "1.00", "kind": "sale"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(refund.refunded_amount(), Decimal::new(1820, 2));
    }

    #[test]
    fn test_shipping_only_refund_returns_no_merchandise() {
        let refund: RefundPayload = serde_json::from_str(
            r#"{
                "id": 3, "order_id": 2,
                "refund_line_items": [],
                "transactions": [{"amount": "10.00", "kind": "refund", "status": "success"}]
            }"#,
        )
        .unwrap();
        assert_eq!(refund.refunded_amount(), Decimal::TEN);
        assert!(refund.refund_line_items.is_empty());
    }

    #[test]
    fn test_refunded_subtotal() {
        let line = RefundLineItem {
            line_item_id: 1,
            quantity: 2,
            subtotal: None,
            line_item: None,
        };
        assert_eq!(line.refunded_subtotal(Decimal::new(1820, 2)), Decimal::new(3640, 2));

        let with_subtotal = RefundLineItem {
            subtotal: Some(Decimal::new(1500, 2)),
            ..line.clone()
        };
        assert_eq!(with_subtotal.refunded_subtotal(Decimal::new(1820, 2)), Decimal::new(1500, 2));

        let restock_only = RefundLineItem { quantity: 0, ..line };
        assert_eq!(restock_only.refunded_subtotal(Decimal::TEN), Decimal::ZERO);
    }

    #[test]
    fn test_gids() {
        assert_eq!(product_gid(7), "gid://shopify/Product/7");
        assert_eq!(variant_gid(9), "gid://shopify/ProductVariant/9");
    }
}
