//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use greenleaf_core::pricing::MemberPrices;

use crate::db::SalesRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::shopify::{MAX_PAGE_SIZE, Product, ProductConnection, ProductQuery, ProductSortKey};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 24;
const DEFAULT_BESTSELLERS: i64 = 8;
const MAX_BESTSELLERS: i64 = 50;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub first: Option<i64>,
    pub after: Option<String>,
    /// Shopify search syntax.
    pub query: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub reverse: bool,
}

impl ListQuery {
    fn into_product_query(self) -> Result<ProductQuery> {
        let sort_key = self
            .sort
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ProductSortKey>)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(ProductQuery {
            first: self.first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            after: self.after.filter(|a| !a.is_empty()),
            query: self.query.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()),
            sort_key,
            reverse: self.reverse,
        })
    }
}

/// List products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductConnection>> {
    let products = state
        .storefront()
        .get_products(query.into_product_query()?)
        .await?;
    Ok(Json(products))
}

/// Bestseller query parameters.
#[derive(Debug, Deserialize)]
pub struct BestsellerQuery {
    pub limit: Option<i64>,
}

/// A product with its sales count.
#[derive(Debug, Serialize)]
pub struct Bestseller {
    pub units_sold: i64,
    pub product: Product,
}

/// Best-selling products, most units first.
///
/// Products deleted from Shopify since they sold are skipped.
///
/// GET /api/products/bestsellers
#[instrument(skip(state))]
pub async fn bestsellers(
    State(state): State<AppState>,
    Query(query): Query<BestsellerQuery>,
) -> Result<Json<Vec<Bestseller>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_BESTSELLERS)
        .clamp(1, MAX_BESTSELLERS);
    let sales = SalesRepository::new(state.pool()).bestsellers(limit).await?;

    let ids: Vec<String> = sales.iter().map(|s| s.product_id.clone()).collect();
    let mut products = state.storefront().get_products_by_ids(&ids).await?;

    let ranked = sales
        .into_iter()
        .filter_map(|sale| {
            let index = products.iter().position(|p| p.id == sale.product_id)?;
            Some(Bestseller {
                units_sold: sale.units_sold,
                product: products.swap_remove(index),
            })
        })
        .collect();

    Ok(Json(ranked))
}

/// A product as shown to the current visitor.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    /// Variant GID to member price. Empty for guests.
    pub member_prices: MemberPrices,
}

/// Product detail.
///
/// GET /api/products/{handle}
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(handle): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;

    let member_prices = if user.is_some() {
        let variant_ids: Vec<String> = product.variants.iter().map(|v| v.id.clone()).collect();
        state
            .pricing()
            .member_prices(state.pool(), &variant_ids)
            .await?
    } else {
        MemberPrices::new()
    };

    Ok(Json(ProductDetail {
        product,
        member_prices,
    }))
}

/// Member price query parameters.
#[derive(Debug, Deserialize)]
pub struct MemberPriceQuery {
    /// Comma-separated variant GIDs.
    pub variant_ids: String,
}

/// Member prices for a set of variants.
///
/// GET /api/member-prices?variant_ids=
#[instrument(skip(state, _user, query))]
pub async fn member_prices(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<MemberPriceQuery>,
) -> Result<Json<MemberPrices>> {
    let variant_ids = parse_id_list(&query.variant_ids);
    if variant_ids.is_empty() {
        return Err(AppError::BadRequest("variant_ids is required".to_owned()));
    }
    if variant_ids.len() > usize::try_from(MAX_PAGE_SIZE).unwrap_or(100) {
        return Err(AppError::BadRequest("too many variant ids".to_owned()));
    }

    let prices = state
        .pricing()
        .member_prices(state.pool(), &variant_ids)
        .await?;
    Ok(Json(prices))
}

/// Split a comma-separated id list, dropping blanks and duplicates.
fn parse_id_list(list: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_owned());
        }
    }
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default().into_product_query().unwrap();
        assert_eq!(query.first, DEFAULT_PAGE_SIZE);
        assert_eq!(query.sort_key, None);
        assert_eq!(query.query, None);
    }

    #[test]
    fn test_list_query_clamps_and_parses() {
        let query = ListQuery {
            first: Some(5_000),
            after: Some(String::new()),
            query: Some("  tag:fern ".to_owned()),
            sort: Some("best-selling".to_owned()),
            reverse: true,
        }
        .into_product_query()
        .unwrap();
        assert_eq!(query.first, MAX_PAGE_SIZE);
        assert_eq!(query.after, None);
        assert_eq!(query.query.as_deref(), Some("tag:fern"));
        assert_eq!(query.sort_key, Some(ProductSortKey::BestSelling));
        assert!(query.reverse);
    }

    #[test]
    fn test_list_query_rejects_unknown_sort() {
        let result = ListQuery {
            sort: Some("popularity".to_owned()),
            ..ListQuery::default()
        }
        .into_product_query();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(
            parse_id_list("gid://shopify/ProductVariant/1, ,gid://shopify/ProductVariant/2,gid://shopify/ProductVariant/1"),
            vec![
                "gid://shopify/ProductVariant/1".to_owned(),
                "gid://shopify/ProductVariant/2".to_owned()
            ]
        );
        assert!(parse_id_list("").is_empty());
    }
}
