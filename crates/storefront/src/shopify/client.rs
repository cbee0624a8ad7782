//! Shopify Storefront API client.
//!
//! Uses `graphql_client` envelopes with `reqwest` 0.13 for HTTP. Caches
//! products and collections using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use super::cache::CacheValue;
use super::proxy::ProxyRequest;
use super::queries::{
    AddLinesVariables, AddToCart, AttributesVariables, CartIdVariables, CartInput, CartPayload,
    CollectionVariables, CreateCart, CreateCartVariables, DiscountCodesVariables, GetCart,
    GetCollectionByHandle, GetProductByHandle, GetProducts, GetProductsByIds, HandleVariables,
    IdsVariables, ProductsVariables, RemoveFromCart, RemoveLinesVariables, UpdateCartAttributes,
    UpdateCartDiscountCodes, UpdateCartLines, UpdateLinesVariables,
};
use super::types::{
    AttributeInput, Cart, CartLineInput, CartLineUpdateInput, Collection, Product,
    ProductConnection, ProductSortKey,
};
use super::{GraphQLError, ShopifyError};
use crate::config::ShopifyConfig;

/// Largest page the API serves.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Parameters for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub first: i64,
    pub after: Option<String>,
    /// Shopify search syntax, e.g. `tag:fern`.
    pub query: Option<String>,
    pub sort_key: Option<ProductSortKey>,
    pub reverse: bool,
}

/// Client for the Shopify Storefront API.
///
/// Products and collections are cached for 5 minutes; carts never are.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<String, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self::with_endpoint(
            format!(
                "https://{}/api/{}/graphql.json",
                config.store, config.api_version
            ),
            config.storefront_private_token.expose_secret(),
            cache,
        )
    }

    fn with_endpoint(endpoint: String, access_token: &str, cache: Cache<String, CacheValue>) -> Self {
        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(15))
                    .build()
                    .unwrap_or_default(),
                endpoint,
                access_token: access_token.to_string(),
                cache,
            }),
        }
    }

    /// POST a body to the API and return the response text.
    async fn post<B: serde::Serialize + ?Sized>(&self, body: &B) -> Result<String, ShopifyError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Shopify-Storefront-Private-Token", &self.inner.access_token)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        Ok(response_text)
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);
        let response_text = self.post(&request_body).await?;
        decode_response::<Q::ResponseData>(&response_text)
    }

    // =========================================================================
    // Products and Collections
    // =========================================================================

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no product has this handle, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = format!("product:{handle}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data = self
            .execute::<GetProductByHandle>(HandleVariables {
                handle: handle.to_string(),
            })
            .await?;

        let product = data
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of products.
    ///
    /// Searches are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, query: ProductQuery) -> Result<ProductConnection, ShopifyError> {
        let cache_key = format!(
            "products:{}:{}:{:?}:{}",
            query.first,
            query.after.as_deref().unwrap_or(""),
            query.sort_key,
            query.reverse
        );
        let cacheable = query.query.is_none();

        if cacheable
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let data = self
            .execute::<GetProducts>(ProductsVariables {
                first: query.first.clamp(1, MAX_PAGE_SIZE),
                after: query.after,
                query: query.query,
                sort_key: query.sort_key,
                reverse: query.reverse.then_some(true),
            })
            .await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(data.products.clone()))
                .await;
        }

        Ok(data.products)
    }

    /// Get products by GID, skipping ids that no longer exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn get_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ShopifyError> {
        let ids: Vec<String> = ids
            .iter()
            .filter(|id| id.starts_with("gid://shopify/Product/"))
            .take(usize::try_from(MAX_PAGE_SIZE).unwrap_or(100))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.execute::<GetProductsByIds>(IdsVariables { ids }).await?;
        Ok(data.nodes.into_iter().flatten().collect())
    }

    /// Get a collection with one page of its products.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no collection has this handle, or
    /// an error if the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_collection_by_handle(
        &self,
        handle: &str,
        first: i64,
        after: Option<String>,
    ) -> Result<Collection, ShopifyError> {
        let cache_key = format!(
            "collection:{handle}:{first}:{}",
            after.as_deref().unwrap_or("")
        );

        if let Some(CacheValue::Collection(collection)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let data = self
            .execute::<GetCollectionByHandle>(CollectionVariables {
                handle: handle.to_string(),
                first: first.clamp(1, MAX_PAGE_SIZE),
                after,
            })
            .await?;

        let collection = data
            .collection
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {handle}")))?;

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Collection(Box::new(collection.clone())),
            )
            .await;

        Ok(collection)
    }

    // =========================================================================
    // Cart (not cached - mutable state)
    // =========================================================================

    /// Create a new cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self, lines, attributes))]
    pub async fn create_cart(
        &self,
        lines: Vec<CartLineInput>,
        attributes: Vec<AttributeInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<CreateCart>(CreateCartVariables {
                input: CartInput { lines, attributes },
            })
            .await?;
        cart_from_payload(data.cart_create, "create cart")
    }

    /// Get an existing cart. `None` once the cart has expired or checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: &str) -> Result<Option<Cart>, ShopifyError> {
        let data = self
            .execute::<GetCart>(CartIdVariables {
                id: cart_id.to_string(),
            })
            .await?;
        Ok(data.cart)
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, lines))]
    pub async fn add_to_cart(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<AddToCart>(AddLinesVariables {
                cart_id: cart_id.to_string(),
                lines,
            })
            .await?;
        cart_from_payload(data.cart_lines_add, "add to cart")
    }

    /// Change line quantities.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, lines))]
    pub async fn update_cart(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<UpdateCartLines>(UpdateLinesVariables {
                cart_id: cart_id.to_string(),
                lines,
            })
            .await?;
        cart_from_payload(data.cart_lines_update, "update cart")
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<RemoveFromCart>(RemoveLinesVariables {
                cart_id: cart_id.to_string(),
                line_ids,
            })
            .await?;
        cart_from_payload(data.cart_lines_remove, "remove from cart")
    }

    /// Replace the cart's discount codes. An empty list clears them.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self))]
    pub async fn update_discount_codes(
        &self,
        cart_id: &str,
        codes: Vec<String>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<UpdateCartDiscountCodes>(DiscountCodesVariables {
                cart_id: cart_id.to_string(),
                discount_codes: codes,
            })
            .await?;
        cart_from_payload(data.cart_discount_codes_update, "update discount codes")
    }

    /// Replace the cart's attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, attributes))]
    pub async fn update_cart_attributes(
        &self,
        cart_id: &str,
        attributes: Vec<AttributeInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<UpdateCartAttributes>(AttributesVariables {
                cart_id: cart_id.to_string(),
                attributes,
            })
            .await?;
        cart_from_payload(data.cart_attributes_update, "update cart attributes")
    }

    // =========================================================================
    // Proxy
    // =========================================================================

    /// Forward a validated read-only document and return Shopify's response as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the body is not JSON.
    #[instrument(skip(self, request), fields(operation = ?request.operation_name))]
    pub async fn proxy(&self, request: &ProxyRequest) -> Result<serde_json::Value, ShopifyError> {
        let response_text = self.post(request).await?;
        Ok(serde_json::from_str(&response_text)?)
    }
}

/// Decode a GraphQL response, surfacing GraphQL errors.
fn decode_response<T: serde::de::DeserializeOwned>(response_text: &str) -> Result<T, ShopifyError> {
    let response: Response<T> = match serde_json::from_str(response_text) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            return Err(ShopifyError::Parse(e));
        }
    };

    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        tracing::debug!(errors = ?errors, "GraphQL errors in response");

        return Err(ShopifyError::GraphQL(
            errors
                .into_iter()
                .map(|e| GraphQLError {
                    path: e
                        .path
                        .unwrap_or_default()
                        .into_iter()
                        .map(|fragment| match fragment {
                            graphql_client::PathFragment::Key(key) => key,
                            graphql_client::PathFragment::Index(i) => i.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("."),
                    message: e.message,
                })
                .collect(),
        ));
    }

    response.data.ok_or_else(|| {
        tracing::error!(
            body = %response_text.chars().take(500).collect::<String>(),
            "Shopify GraphQL response has no data and no errors"
        );
        ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
    })
}

/// Turn a cart mutation payload into the cart, surfacing user errors.
fn cart_from_payload(payload: Option<CartPayload>, action: &str) -> Result<Cart, ShopifyError> {
    let Some(payload) = payload else {
        return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
            "Failed to {action}"
        ))]));
    };

    if !payload.user_errors.is_empty() {
        return Err(ShopifyError::UserError(
            payload
                .user_errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        ));
    }

    payload
        .cart
        .ok_or_else(|| ShopifyError::GraphQL(vec![GraphQLError::message(format!("Failed to {action}"))]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::queries::ProductData;

    #[test]
    fn test_decode_response_maps_graphql_errors() {
        let body = r#"{
            "data": null,
            "errors": [{"message": "Field 'x' doesn't exist", "locations": [{"line": 2, "column": 5}], "path": ["product", 0]}]
        }"#;
        let err = decode_response::<ProductData>(body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field 'x' doesn't exist (at product.0)"
        );
    }

    #[test]
    fn test_decode_response_without_data() {
        let err = decode_response::<ProductData>(r#"{"data": null}"#).unwrap_err();
        assert!(err.to_string().contains("No data in response"));
    }

    #[test]
    fn test_decode_response_missing_product_is_none() {
        let data = decode_response::<ProductData>(r#"{"data": {"product": null}}"#).unwrap();
        assert!(data.product.is_none());
    }

    #[test]
    fn test_cart_user_errors_are_joined() {
        let payload = CartPayload {
            cart: None,
            user_errors: vec![
                crate::shopify::types::CartUserError {
                    code: Some("INVALID".to_owned()),
                    field: None,
                    message: "Quantity too high".to_owned(),
                },
                crate::shopify::types::CartUserError {
                    code: None,
                    field: Some(vec!["lines".to_owned()]),
                    message: "Variant unavailable".to_owned(),
                },
            ],
        };
        let err = cart_from_payload(Some(payload), "add to cart").unwrap_err();
        assert_eq!(
            err.to_string(),
            "User error: Quantity too high; Variant unavailable"
        );
        assert!(cart_from_payload(None, "add to cart").is_err());
    }
}
