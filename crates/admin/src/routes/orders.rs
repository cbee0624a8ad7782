//! Read-only order, donation and sales reporting.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use greenleaf_core::models::{Donation, Order, OrderLine, ProductSales};
use greenleaf_core::{OrderId, OrderStatus};

use crate::db::orders::DonationTotals;
use crate::db::{DonationRepository, OrderRepository, Page, SalesRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::PageQuery;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// GET /api/admin/orders?status=
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list(filter.status, Page::new(filter.limit, filter.offset))
            .await?,
    ))
}

/// GET /api/admin/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".into()))?;
    let lines = repo.lines(id).await?;
    Ok(Json(OrderDetail { order, lines }))
}

/// GET /api/admin/donations
pub async fn donations(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Donation>>> {
    Ok(Json(
        DonationRepository::new(state.pool())
            .list(page.page())
            .await?,
    ))
}

/// GET /api/admin/donations/totals
pub async fn donation_totals(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<DonationTotals>> {
    Ok(Json(DonationRepository::new(state.pool()).totals().await?))
}

/// GET /api/admin/product-sales
///
/// Best sellers first.
pub async fn product_sales(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ProductSales>>> {
    Ok(Json(
        SalesRepository::new(state.pool())
            .list(page.page())
            .await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_filter_parses_status() {
        let uri: axum::http::Uri = "/api/admin/orders?status=partially_refunded&offset=20"
            .parse()
            .unwrap();
        let Query(filter) = Query::<OrderFilter>::try_from_uri(&uri).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::PartiallyRefunded));
        assert_eq!(filter.offset, Some(20));
        assert_eq!(filter.limit, None);
    }
}
