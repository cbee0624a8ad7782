//! Account route handlers.
//!
//! Profile and order history require a signed-in member. The wishlist
//! works for guests too: their saved products live in the session until
//! they sign in.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use greenleaf_core::UserId;
use greenleaf_core::models::{Order, OrderLine};

use crate::db::{OrderRepository, UserRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{GuestWishlist, User, keys};
use crate::shopify::{MAX_PAGE_SIZE, Product};
use crate::state::AppState;

const ORDER_HISTORY_LIMIT: i64 = 50;

/// Most products a wishlist can hold.
const MAX_WISHLIST_ITEMS: usize = 100;

/// The signed-in member's profile.
///
/// GET /api/account
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_owned()))?;
    Ok(Json(user))
}

/// An order with its lines.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Order history, newest first.
///
/// GET /api/account/orders
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let repo = OrderRepository::new(state.pool());
    let orders = repo
        .list_for_user(current_user.id, ORDER_HISTORY_LIMIT)
        .await?;
    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    let lines = repo.lines_for_orders(&ids).await?;

    Ok(Json(group_lines(orders, lines)))
}

fn group_lines(orders: Vec<Order>, mut lines: Vec<OrderLine>) -> Vec<OrderView> {
    orders
        .into_iter()
        .map(|order| {
            let (own, rest): (Vec<_>, Vec<_>) =
                lines.drain(..).partition(|line| line.order_id == order.id);
            lines = rest;
            OrderView { order, lines: own }
        })
        .collect()
}

// =============================================================================
// Wishlist
// =============================================================================

/// Saved product ids for the current visitor.
async fn saved_product_ids(
    state: &AppState,
    session: &Session,
    user_id: Option<UserId>,
) -> Result<Vec<String>> {
    match user_id {
        Some(user_id) => Ok(WishlistRepository::new(state.pool())
            .list(user_id)
            .await?
            .into_iter()
            .map(|item| item.product_id)
            .collect()),
        None => Ok(guest_wishlist(session).await.product_ids),
    }
}

async fn guest_wishlist(session: &Session) -> GuestWishlist {
    session
        .get::<GuestWishlist>(keys::GUEST_WISHLIST)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Move a guest wishlist into the member's account.
///
/// # Errors
///
/// Returns an error if the merge or the session update fails.
pub async fn merge_guest_wishlist(
    state: &AppState,
    session: &Session,
    user_id: UserId,
) -> Result<()> {
    let guest = guest_wishlist(session).await;
    if guest.product_ids.is_empty() {
        return Ok(());
    }

    let merged = WishlistRepository::new(state.pool())
        .merge(user_id, &guest.product_ids)
        .await?;
    session.remove::<GuestWishlist>(keys::GUEST_WISHLIST).await?;
    info!(user_id = %user_id, merged, "Merged guest wishlist");
    Ok(())
}

/// Saved products, skipping any that no longer exist in Shopify.
///
/// GET /api/account/wishlist
#[instrument(skip(state, session, user))]
pub async fn wishlist(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<Vec<Product>>> {
    let ids = saved_product_ids(&state, &session, user.map(|u| u.id)).await?;
    let limit = usize::try_from(MAX_PAGE_SIZE).unwrap_or(MAX_WISHLIST_ITEMS);
    let ids: Vec<String> = ids.into_iter().take(limit).collect();

    let mut products = state.storefront().get_products_by_ids(&ids).await?;
    products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
    Ok(Json(products))
}

/// Wishlist add body.
#[derive(Debug, Deserialize)]
pub struct WishlistInput {
    pub handle: String,
}

/// Save a product.
///
/// POST /api/account/wishlist
#[instrument(skip(state, session, user))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<WishlistInput>,
) -> Result<StatusCode> {
    let product = state.storefront().get_product_by_handle(&input.handle).await?;

    let added = match user {
        Some(user) => {
            let repo = WishlistRepository::new(state.pool());
            if repo.list(user.id).await?.len() >= MAX_WISHLIST_ITEMS {
                return Err(wishlist_full());
            }
            repo.add(user.id, &product.id).await?
        }
        None => {
            let mut list = guest_wishlist(&session).await;
            if list.product_ids.len() >= MAX_WISHLIST_ITEMS {
                return Err(wishlist_full());
            }
            let added = list.add(&product.id);
            session.insert(keys::GUEST_WISHLIST, &list).await?;
            added
        }
    };

    Ok(if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

fn wishlist_full() -> AppError {
    AppError::BadRequest(format!(
        "Wishlist can hold at most {MAX_WISHLIST_ITEMS} products"
    ))
}

/// Remove a saved product.
///
/// DELETE /api/account/wishlist/{handle}
#[instrument(skip(state, session, user))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(handle): Path<String>,
) -> Result<StatusCode> {
    let product = state.storefront().get_product_by_handle(&handle).await?;

    let removed = match user {
        Some(user) => {
            WishlistRepository::new(state.pool())
                .remove(user.id, &product.id)
                .await?
        }
        None => {
            let mut list = guest_wishlist(&session).await;
            let removed = list.remove(&product.id);
            if removed {
                session.insert(keys::GUEST_WISHLIST, &list).await?;
            }
            removed
        }
    };

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Product is not on the wishlist".to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use greenleaf_core::{OrderId, OrderStatus};

    use super::*;

    fn order(id: i32) -> Order {
        Order {
            id: OrderId::new(id),
            shopify_order_id: i64::from(id) * 1000,
            order_number: format!("#{id}"),
            email: None,
            user_id: None,
            currency_code: "USD".to_owned(),
            subtotal: Decimal::TEN,
            total: Decimal::TEN,
            refunded_total: Decimal::ZERO,
            status: OrderStatus::Paid,
            affiliate_code: None,
            influencer_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(order_id: i32, line_id: i64) -> OrderLine {
        OrderLine {
            order_id: OrderId::new(order_id),
            shopify_line_id: line_id,
            product_id: None,
            variant_id: None,
            title: "Fern".to_owned(),
            quantity: 1,
            price: Decimal::TEN,
        }
    }

    #[test]
    fn test_group_lines_by_order() {
        let grouped = group_lines(
            vec![order(2), order(1)],
            vec![line(1, 10), line(2, 20), line(1, 11)],
        );
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.first().unwrap().order.id, OrderId::new(2));
        assert_eq!(grouped.first().unwrap().lines.len(), 1);
        let second = grouped.get(1).unwrap();
        assert_eq!(
            second.lines.iter().map(|l| l.shopify_line_id).collect::<Vec<_>>(),
            vec![10, 11]
        );
    }
}
