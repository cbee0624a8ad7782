//! Domain types for the Shopify Storefront API.
//!
//! Responses decode straight into these types: fields are read in GraphQL's
//! camelCase and written back out in snake case for the JSON API.
//! Connections (`{ nodes: [...] }`) are flattened into plain vectors.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Unwrap a `{ "nodes": [...] }` connection into its nodes.
fn nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    struct Connection<T> {
        nodes: Vec<T>,
    }

    Ok(Option::<Connection<T>>::deserialize(deserializer)?
        .map(|c| c.nodes)
        .unwrap_or_default())
}

// =============================================================================
// Money and Images
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Money {
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

/// Price range for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct PriceRange {
    pub min_variant_price: Money,
    pub max_variant_price: Money,
}

/// Product or collection image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Image {
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

// =============================================================================
// Products and Collections
// =============================================================================

/// A chosen option value on a variant, e.g. `Size: Large`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub sku: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    pub image: Option<Image>,
}

/// A product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Product {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub available_for_sale: bool,
    pub vendor: String,
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<Image>,
    #[serde(default, deserialize_with = "nodes")]
    pub images: Vec<Image>,
    pub price_range: PriceRange,
    #[serde(default, deserialize_with = "nodes")]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Variant with the given GID.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// Cursor pagination info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ProductConnection {
    #[serde(rename(deserialize = "nodes"))]
    pub products: Vec<Product>,
    pub page_info: PageInfo,
}

/// A collection with one page of its products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Collection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub image: Option<Image>,
    pub products: ProductConnection,
}

/// Product list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductSortKey {
    BestSelling,
    CreatedAt,
    Price,
    Relevance,
    Title,
    UpdatedAt,
}

impl FromStr for ProductSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_selling" | "best-selling" => Ok(Self::BestSelling),
            "created_at" | "newest" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "relevance" => Ok(Self::Relevance),
            "title" => Ok(Self::Title),
            "updated_at" => Ok(Self::UpdatedAt),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Key/value attribute on a cart or cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

/// Attribute input for cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInput {
    pub key: String,
    pub value: String,
}

impl AttributeInput {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The product a cart line's variant belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMerchandiseProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
}

/// The variant on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartMerchandise {
    pub id: String,
    pub title: String,
    pub price: Money,
    pub image: Option<Image>,
    pub product: CartMerchandiseProduct,
}

/// Cost of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct CartLineCost {
    pub amount_per_quantity: Money,
    pub total_amount: Money,
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub quantity: i64,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub cost: CartLineCost,
    pub merchandise: CartMerchandise,
}

/// Cart cost summary as Shopify computes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct CartCost {
    pub subtotal_amount: Money,
    pub total_amount: Money,
}

/// Discount code applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDiscountCode {
    pub code: String,
    pub applicable: bool,
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Cart {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
    pub note: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub discount_codes: Vec<CartDiscountCode>,
    pub cost: CartCost,
    #[serde(default, deserialize_with = "nodes")]
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Value of a cart attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }
}

/// Input for adding a line to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product variant GID.
    pub merchandise_id: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeInput>,
}

/// Input for changing a cart line's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateInput {
    /// Cart line GID.
    pub id: String,
    pub quantity: i64,
}

/// User error from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUserError {
    pub code: Option<String>,
    pub field: Option<Vec<String>>,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_decodes_from_graphql_shape() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/Cart/c1",
            "checkoutUrl": "https://shop.example/cart/c/c1",
            "totalQuantity": 2,
            "note": null,
            "attributes": [{"key": "affiliate_code", "value": "SAM"}],
            "discountCodes": [{"code": "LEAFY10", "applicable": true}],
            "cost": {
                "subtotalAmount": {"amount": "36.5", "currencyCode": "USD"},
                "totalAmount": {"amount": "36.5", "currencyCode": "USD"}
            },
            "lines": {"nodes": [{
                "id": "gid://shopify/CartLine/1",
                "quantity": 2,
                "attributes": [],
                "cost": {
                    "amountPerQuantity": {"amount": "18.25", "currencyCode": "USD"},
                    "totalAmount": {"amount": "36.5", "currencyCode": "USD"}
                },
                "merchandise": {
                    "id": "gid://shopify/ProductVariant/9",
                    "title": "Small",
                    "price": {"amount": "18.25", "currencyCode": "USD"},
                    "image": null,
                    "product": {"id": "gid://shopify/Product/7", "handle": "fern", "title": "Fern"}
                }
            }]}
        }))
        .unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].cost.amount_per_quantity.amount, Decimal::new(1825, 2));
        assert_eq!(cart.attribute("affiliate_code"), Some("SAM"));
        assert_eq!(cart.attribute("missing"), None);

        // Written back out in snake case
        let out = serde_json::to_value(&cart).unwrap();
        assert!(out.get("checkout_url").is_some());
        assert!(out["lines"].is_array());
    }

    #[test]
    fn test_missing_connection_is_empty() {
        let cost = serde_json::json!({
            "subtotalAmount": {"amount": "0", "currencyCode": "USD"},
            "totalAmount": {"amount": "0", "currencyCode": "USD"}
        });
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": "c", "checkoutUrl": "u", "totalQuantity": 0, "note": null,
            "cost": cost, "lines": null
        }))
        .unwrap();
        assert!(cart.lines.is_empty());
    }

    #[test]
    fn test_sort_key_parse_and_serialize() {
        assert_eq!("price".parse::<ProductSortKey>().unwrap(), ProductSortKey::Price);
        assert_eq!(
            "best-selling".parse::<ProductSortKey>().unwrap(),
            ProductSortKey::BestSelling
        );
        assert!("cheapest".parse::<ProductSortKey>().is_err());
        assert_eq!(
            serde_json::to_value(ProductSortKey::BestSelling).unwrap(),
            serde_json::json!("BEST_SELLING")
        );
    }

    #[test]
    fn test_line_input_serializes_camel_case() {
        let input = CartLineInput {
            merchandise_id: "gid://shopify/ProductVariant/1".to_owned(),
            quantity: 1,
            attributes: vec![],
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["merchandiseId"], "gid://shopify/ProductVariant/1");
        assert!(value.get("attributes").is_none());
    }
}
