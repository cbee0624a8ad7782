//! Cart route handlers.
//!
//! Cart IDs are stored in the session and mapped to Shopify carts. Totals
//! are computed here from the discount rules so the shopper sees member,
//! volume and bundle savings before checkout. The donation choice and any
//! promotion codes also live in the session until checkout copies them onto
//! the Shopify cart: codes as attributes, the donation as a line of the
//! one-cent donation variant so Shopify charges it.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use greenleaf_core::DonationSource;
use greenleaf_core::donation::validate_donation_amount;
use greenleaf_core::models::Influencer;
use greenleaf_core::pricing::{CartTotals, PricingRules, compute_totals};
use greenleaf_core::webhook::{
    AFFILIATE_ATTRIBUTE, DONATION_LINE_PROPERTY, INFLUENCER_ATTRIBUTE, MEMBER_ATTRIBUTE,
    STOREFRONT_DISCOUNT_ATTRIBUTE,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, DonationChoice, keys};
use crate::services::pricing::{GIFT_LINE_ATTRIBUTE, is_donation_line, is_gift_line};
use crate::services::{AppliedCode, PromoError, PromotionService};
use crate::shopify::{AttributeInput, Cart, CartLine, CartLineInput, CartLineUpdateInput};
use crate::state::AppState;

/// Largest quantity accepted for one line.
const MAX_LINE_QUANTITY: i64 = 99;

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart ID from the session.
async fn get_cart_id(session: &Session) -> Option<String> {
    session.get::<String>(keys::CART_ID).await.ok().flatten()
}

/// Set the cart ID in the session.
async fn set_cart_id(session: &Session, cart_id: &str) -> Result<()> {
    session.insert(keys::CART_ID, cart_id).await?;
    Ok(())
}

async fn donation_choice(session: &Session) -> DonationChoice {
    session
        .get::<DonationChoice>(keys::DONATION)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn session_code(session: &Session, key: &str) -> Option<String> {
    session.get::<String>(key).await.ok().flatten()
}

/// The shopper's Shopify cart, forgetting ids of carts that expired or
/// were checked out.
async fn current_cart(state: &AppState, session: &Session) -> Result<Option<Cart>> {
    let Some(cart_id) = get_cart_id(session).await else {
        return Ok(None);
    };

    let cart = state.storefront().get_cart(&cart_id).await?;
    if cart.is_none() {
        info!(cart_id = %cart_id, "Cart no longer exists, clearing session");
        session.remove::<String>(keys::CART_ID).await?;
    }
    Ok(cart)
}

async fn require_cart(state: &AppState, session: &Session) -> Result<Cart> {
    current_cart(state, session)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_owned()))
}

/// Add lines to the current cart, creating one if needed.
async fn add_lines(state: &AppState, session: &Session, lines: Vec<CartLineInput>) -> Result<Cart> {
    if let Some(cart) = current_cart(state, session).await? {
        return Ok(state.storefront().add_to_cart(&cart.id, lines).await?);
    }

    let cart = state.storefront().create_cart(lines, vec![]).await?;
    set_cart_id(session, &cart.id).await?;
    Ok(cart)
}

// =============================================================================
// Response Types
// =============================================================================

/// Codes the shopper has applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartCodes {
    pub affiliate_code: Option<String>,
    pub influencer_code: Option<String>,
}

/// Cart with storefront-computed totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    /// `None` until the first line is added.
    pub cart: Option<Cart>,
    pub totals: CartTotals,
    pub donation: DonationChoice,
    pub codes: CartCodes,
}

fn empty_totals() -> CartTotals {
    compute_totals(&[], &PricingRules::default(), None, false)
}

async fn cart_view(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    cart: Option<Cart>,
) -> Result<CartView> {
    let donation = donation_choice(session).await;
    let totals = match &cart {
        Some(cart) => {
            state
                .pricing()
                .cart_totals(state.pool(), cart, user.is_some(), donation)
                .await?
        }
        None => empty_totals(),
    };

    Ok(CartView {
        cart,
        totals,
        donation,
        codes: CartCodes {
            affiliate_code: session_code(session, keys::AFFILIATE_CODE).await,
            influencer_code: session_code(session, keys::INFLUENCER_CODE).await,
        },
    })
}

// =============================================================================
// Cart Lines
// =============================================================================

/// Show the cart.
///
/// GET /api/cart
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let cart = current_cart(&state, &session).await?;
    Ok(Json(cart_view(&state, &session, user.as_ref(), cart).await?))
}

/// Add to cart body.
#[derive(Debug, Deserialize)]
pub struct AddLineInput {
    /// Product variant GID.
    pub variant_id: String,
    pub quantity: Option<i64>,
}

fn check_quantity(quantity: i64, allow_zero: bool) -> Result<i64> {
    let min = i64::from(!allow_zero);
    if (min..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(AppError::BadRequest(format!(
            "quantity must be between {min} and {MAX_LINE_QUANTITY}"
        )))
    }
}

/// Add a variant to the cart.
///
/// POST /api/cart/lines
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<AddLineInput>,
) -> Result<Json<CartView>> {
    let quantity = check_quantity(input.quantity.unwrap_or(1), false)?;
    if !input.variant_id.starts_with("gid://shopify/ProductVariant/") {
        return Err(AppError::BadRequest("variant_id must be a variant GID".to_owned()));
    }

    let cart = add_lines(
        &state,
        &session,
        vec![CartLineInput {
            merchandise_id: input.variant_id.clone(),
            quantity,
            attributes: vec![],
        }],
    )
    .await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("variant_id", &input.variant_id)]));
    Ok(Json(cart_view(&state, &session, user.as_ref(), Some(cart)).await?))
}

/// Update line body.
#[derive(Debug, Deserialize)]
pub struct UpdateLineInput {
    /// Cart line GID.
    pub line_id: String,
    /// Zero removes the line.
    pub quantity: i64,
}

/// Change a line's quantity.
///
/// PATCH /api/cart/lines
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<UpdateLineInput>,
) -> Result<Json<CartView>> {
    let quantity = check_quantity(input.quantity, true)?;
    let cart = require_cart(&state, &session).await?;

    let line = cart
        .lines
        .iter()
        .find(|line| line.id == input.line_id)
        .ok_or_else(|| AppError::NotFound("Cart line not found".to_owned()))?;
    check_editable(line)?;

    let cart = if quantity == 0 {
        state
            .storefront()
            .remove_from_cart(&cart.id, vec![input.line_id])
            .await?
    } else {
        state
            .storefront()
            .update_cart(
                &cart.id,
                vec![CartLineUpdateInput {
                    id: input.line_id,
                    quantity,
                }],
            )
            .await?
    };

    Ok(Json(cart_view(&state, &session, user.as_ref(), Some(cart)).await?))
}

/// Remove a line. The line GID is URL-encoded in the path.
///
/// DELETE /api/cart/lines/{line_id}
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(line_id): Path<String>,
) -> Result<Json<CartView>> {
    let cart = require_cart(&state, &session).await?;
    let line = cart
        .lines
        .iter()
        .find(|line| line.id == line_id)
        .ok_or_else(|| AppError::NotFound("Cart line not found".to_owned()))?;
    check_editable(line)?;

    let cart = state
        .storefront()
        .remove_from_cart(&cart.id, vec![line_id])
        .await?;
    Ok(Json(cart_view(&state, &session, user.as_ref(), Some(cart)).await?))
}

/// Gift and donation lines follow the session, not direct edits.
fn check_editable(line: &CartLine) -> Result<()> {
    if is_gift_line(line) {
        return Err(AppError::BadRequest("Gift lines can't be changed".to_owned()));
    }
    if is_donation_line(line) {
        return Err(AppError::BadRequest(
            "Change the donation from the cart's donation options".to_owned(),
        ));
    }
    Ok(())
}

/// True when nothing in the cart is actual merchandise.
fn has_no_merchandise(cart: &Cart) -> bool {
    cart.lines
        .iter()
        .all(|line| is_gift_line(line) || is_donation_line(line))
}

// =============================================================================
// Donations
// =============================================================================

fn require_donation_variant(state: &AppState) -> Result<()> {
    if state.config().shopify.donation_variant_id.is_none() {
        return Err(AppError::ServiceUnavailable(
            "Donations are not available right now".to_owned(),
        ));
    }
    Ok(())
}

/// Round-up toggle body.
#[derive(Debug, Deserialize)]
pub struct RoundUpInput {
    pub enabled: bool,
}

/// Turn the round-up donation on or off.
///
/// Turning it off leaves a fixed donation in place.
///
/// PUT /api/cart/round-up
#[instrument(skip(state, session, user))]
pub async fn set_round_up(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<RoundUpInput>,
) -> Result<Json<CartView>> {
    if input.enabled {
        require_donation_variant(&state)?;
    }
    let current = donation_choice(&session).await;
    let choice = toggle_round_up(current, input.enabled);
    session.insert(keys::DONATION, choice).await?;

    let cart = current_cart(&state, &session).await?;
    Ok(Json(cart_view(&state, &session, user.as_ref(), cart).await?))
}

const fn toggle_round_up(current: DonationChoice, enabled: bool) -> DonationChoice {
    match (enabled, current) {
        (true, _) => DonationChoice::RoundUp,
        (false, DonationChoice::RoundUp) => DonationChoice::None,
        (false, other) => other,
    }
}

/// Fixed donation body. `null` clears the donation.
#[derive(Debug, Deserialize)]
pub struct DonationInput {
    pub amount: Option<Decimal>,
}

/// Set a fixed donation, replacing any round-up.
///
/// PUT /api/cart/donation
#[instrument(skip(state, session, user))]
pub async fn set_donation(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<DonationInput>,
) -> Result<Json<CartView>> {
    let choice = match input.amount {
        Some(amount) => {
            require_donation_variant(&state)?;
            DonationChoice::Fixed(
                validate_donation_amount(amount)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?,
            )
        }
        None => DonationChoice::None,
    };
    session.insert(keys::DONATION, choice).await?;

    let cart = current_cart(&state, &session).await?;
    Ok(Json(cart_view(&state, &session, user.as_ref(), cart).await?))
}

// =============================================================================
// Promotion Codes
// =============================================================================

/// Code entry body.
#[derive(Debug, Deserialize)]
pub struct CodeInput {
    pub code: String,
}

/// Result of applying a code.
#[derive(Debug, Serialize)]
pub struct AppliedCodeView {
    pub applied: AppliedCode,
    #[serde(flatten)]
    pub cart: CartView,
}

/// Apply an influencer or affiliate code.
///
/// An influencer code with a free product adds the gift to the cart.
///
/// POST /api/cart/codes
#[instrument(skip(state, session, user, input))]
pub async fn apply_code(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(input): Json<CodeInput>,
) -> Result<Json<AppliedCodeView>> {
    let applied = PromotionService::new(state.pool())
        .apply_code(&input.code)
        .await?;

    let mut cart = current_cart(&state, &session).await?;
    match &applied {
        AppliedCode::Influencer {
            code,
            free_product_variant_id,
            ..
        } => {
            if session_code(&session, keys::INFLUENCER_CODE).await.as_deref() != Some(code) {
                cart = match cart {
                    Some(cart) => Some(remove_gift_lines(&state, cart).await?),
                    None => None,
                };
            }
            session.insert(keys::INFLUENCER_CODE, code).await?;
            if let Some(variant_id) = free_product_variant_id {
                cart = Some(ensure_gift_line(&state, &session, cart, code, variant_id).await?);
            }
        }
        AppliedCode::Affiliate { code, .. } => {
            session.insert(keys::AFFILIATE_CODE, code).await?;
        }
    }

    add_breadcrumb("cart", "Applied code", Some(&[("code", applied.code())]));
    let cart = cart_view(&state, &session, user.as_ref(), cart).await?;
    Ok(Json(AppliedCodeView { applied, cart }))
}

/// Clear all codes, gift lines and Shopify discount codes.
///
/// DELETE /api/cart/codes
#[instrument(skip(state, session, user))]
pub async fn clear_codes(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    session.remove::<String>(keys::INFLUENCER_CODE).await?;
    session.remove::<String>(keys::AFFILIATE_CODE).await?;

    let cart = match current_cart(&state, &session).await? {
        Some(cart) => {
            let cart = remove_gift_lines(&state, cart).await?;
            if cart.discount_codes.is_empty() {
                Some(cart)
            } else {
                Some(state.storefront().update_discount_codes(&cart.id, vec![]).await?)
            }
        }
        None => None,
    };

    Ok(Json(cart_view(&state, &session, user.as_ref(), cart).await?))
}

async fn ensure_gift_line(
    state: &AppState,
    session: &Session,
    cart: Option<Cart>,
    code: &str,
    variant_id: &str,
) -> Result<Cart> {
    let gift = CartLineInput {
        merchandise_id: variant_id.to_owned(),
        quantity: 1,
        attributes: vec![AttributeInput::new(GIFT_LINE_ATTRIBUTE, code)],
    };

    match cart {
        Some(cart) if cart.lines.iter().any(is_gift_line) => Ok(cart),
        Some(cart) => Ok(state.storefront().add_to_cart(&cart.id, vec![gift]).await?),
        None => add_lines(state, session, vec![gift]).await,
    }
}

async fn remove_gift_lines(state: &AppState, cart: Cart) -> Result<Cart> {
    let gift_ids: Vec<String> = cart
        .lines
        .iter()
        .filter(|line| is_gift_line(line))
        .map(|line| line.id.clone())
        .collect();
    if gift_ids.is_empty() {
        return Ok(cart);
    }
    Ok(state.storefront().remove_from_cart(&cart.id, gift_ids).await?)
}

// =============================================================================
// Checkout
// =============================================================================

/// Where to send the shopper.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub checkout_url: String,
    pub totals: CartTotals,
}

/// Copy donation, codes and member identity onto the Shopify cart and
/// return its checkout URL.
///
/// Codes are checked again here; an influencer code that has since expired
/// or run out is removed and the request fails so the shopper can review
/// the cart.
///
/// POST /api/checkout
#[instrument(skip(state, session, user))]
pub async fn checkout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CheckoutView>> {
    let mut cart = require_cart(&state, &session).await?;
    if has_no_merchandise(&cart) {
        return Err(AppError::BadRequest("Cart is empty".to_owned()));
    }

    let promotions = PromotionService::new(state.pool());
    let mut discount_codes = Vec::new();

    let influencer = match session_code(&session, keys::INFLUENCER_CODE).await {
        Some(code) => match promotions.validate_influencer(&code).await {
            Ok(influencer) => Some(influencer),
            Err(e @ (PromoError::NotFound | PromoError::Rejected(_))) => {
                session.remove::<String>(keys::INFLUENCER_CODE).await?;
                remove_gift_lines(&state, cart).await?;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };
    if let Some(influencer) = &influencer {
        discount_codes.push(influencer.code.clone());
        if let Some(variant_id) = &influencer.free_product_variant_id {
            cart = ensure_gift_line(&state, &session, Some(cart), &influencer.code, variant_id)
                .await?;
        }
    }

    let affiliate = match session_code(&session, keys::AFFILIATE_CODE).await {
        Some(code) => match promotions.resolve_affiliate(&code).await {
            Ok(affiliate) => Some(affiliate),
            Err(PromoError::NotFound | PromoError::InvalidCode(_)) => {
                info!(code = %code, "Dropping inactive affiliate code");
                session.remove::<String>(keys::AFFILIATE_CODE).await?;
                None
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };
    if let Some(code) = affiliate.as_ref().and_then(|a| a.customer_discount_code.clone()) {
        discount_codes.push(code);
    }

    let donation = donation_choice(&session).await;
    let totals = state
        .pricing()
        .cart_totals(state.pool(), &cart, user.is_some(), donation)
        .await?;

    let line = match (donation.source(), &state.config().shopify.donation_variant_id) {
        (Some(source), Some(variant_id)) => donation_line(variant_id, totals.donation, source),
        (Some(_), None) => {
            warn!("Donation chosen but no donation variant configured, skipping");
            None
        }
        (None, _) => None,
    };
    let cart = sync_donation_line(&state, cart, line).await?;

    let attributes = checkout_attributes(
        &totals,
        user.as_ref(),
        affiliate.as_ref().map(|a| a.code.as_str()),
        influencer.as_ref(),
    );

    let cart = state
        .storefront()
        .update_cart_attributes(&cart.id, attributes)
        .await?;
    let cart = state
        .storefront()
        .update_discount_codes(&cart.id, discount_codes)
        .await?;

    for code in cart.discount_codes.iter().filter(|c| !c.applicable) {
        warn!(code = %code.code, "Shopify did not accept discount code");
    }

    add_breadcrumb("checkout", "Started checkout", None);
    Ok(Json(CheckoutView {
        checkout_url: cart.checkout_url,
        totals,
    }))
}

/// One-cent donation variant line whose quantity is the donation in cents.
fn donation_line(
    variant_id: &str,
    amount: Decimal,
    source: DonationSource,
) -> Option<CartLineInput> {
    let cents = (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .filter(|cents| *cents > 0)?;
    Some(CartLineInput {
        merchandise_id: variant_id.to_owned(),
        quantity: cents,
        attributes: vec![AttributeInput::new(DONATION_LINE_PROPERTY, source.as_str())],
    })
}

/// Replace any donation line on the cart with `line`.
async fn sync_donation_line(
    state: &AppState,
    cart: Cart,
    line: Option<CartLineInput>,
) -> Result<Cart> {
    let stale: Vec<String> = cart
        .lines
        .iter()
        .filter(|line| is_donation_line(line))
        .map(|line| line.id.clone())
        .collect();
    let cart = if stale.is_empty() {
        cart
    } else {
        state.storefront().remove_from_cart(&cart.id, stale).await?
    };

    match line {
        Some(line) => Ok(state.storefront().add_to_cart(&cart.id, vec![line]).await?),
        None => Ok(cart),
    }
}

/// Attributes the `orders/paid` webhook reads back.
fn checkout_attributes(
    totals: &CartTotals,
    user: Option<&CurrentUser>,
    affiliate_code: Option<&str>,
    influencer: Option<&Influencer>,
) -> Vec<AttributeInput> {
    let mut attributes = Vec::new();

    if let Some(code) = affiliate_code {
        attributes.push(AttributeInput::new(AFFILIATE_ATTRIBUTE, code));
    }
    if let Some(influencer) = influencer {
        attributes.push(AttributeInput::new(INFLUENCER_ATTRIBUTE, &influencer.code));
    }
    if let Some(user) = user {
        attributes.push(AttributeInput::new(MEMBER_ATTRIBUTE, user.id.to_string()));
    }
    let savings = totals.total_savings();
    if savings > Decimal::ZERO {
        attributes.push(AttributeInput::new(STOREFRONT_DISCOUNT_ATTRIBUTE, savings.to_string()));
    }

    attributes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use greenleaf_core::pricing::PricedLine;
    use greenleaf_core::{Email, UserId};

    use super::*;

    fn totals(round_up: bool) -> CartTotals {
        compute_totals(
            &[PricedLine {
                product_id: "gid://shopify/Product/1".to_owned(),
                variant_id: "gid://shopify/ProductVariant/11".to_owned(),
                quantity: 2,
                unit_price: Decimal::new(1170, 2),
            }],
            &PricingRules::default(),
            None,
            round_up,
        )
    }

    const DONATION_VARIANT: &str = "gid://shopify/ProductVariant/44100";

    fn attribute<'a>(attributes: &'a [AttributeInput], key: &str) -> Option<&'a str> {
        attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    #[test]
    fn test_check_quantity() {
        assert!(check_quantity(0, false).is_err());
        assert_eq!(check_quantity(0, true).unwrap(), 0);
        assert_eq!(check_quantity(99, false).unwrap(), 99);
        assert!(check_quantity(100, true).is_err());
        assert!(check_quantity(-1, true).is_err());
    }

    #[test]
    fn test_toggle_round_up() {
        let fixed = DonationChoice::Fixed(Decimal::from(5));
        assert_eq!(toggle_round_up(DonationChoice::None, true), DonationChoice::RoundUp);
        assert_eq!(toggle_round_up(fixed, true), DonationChoice::RoundUp);
        assert_eq!(toggle_round_up(DonationChoice::RoundUp, false), DonationChoice::None);
        assert_eq!(toggle_round_up(fixed, false), fixed);
    }

    #[test]
    fn test_checkout_attributes_for_member() {
        let user = CurrentUser {
            id: UserId::new(12),
            email: Email::parse("sam@example.com").unwrap(),
        };
        let attributes = checkout_attributes(&totals(true), Some(&user), Some("SAM"), None);

        assert_eq!(attribute(&attributes, MEMBER_ATTRIBUTE), Some("12"));
        assert_eq!(attribute(&attributes, AFFILIATE_ATTRIBUTE), Some("SAM"));
        assert_eq!(attribute(&attributes, INFLUENCER_ATTRIBUTE), None);
        assert_eq!(attribute(&attributes, STOREFRONT_DISCOUNT_ATTRIBUTE), None);
    }

    #[test]
    fn test_checkout_attributes_for_guest_without_donation() {
        let attributes = checkout_attributes(&totals(false), None, None, None);
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_round_up_donation_line_is_charged_in_cents() {
        let totals = totals(true);
        let line =
            donation_line(DONATION_VARIANT, totals.donation, DonationSource::RoundUp).unwrap();

        assert_eq!(line.merchandise_id, DONATION_VARIANT);
        assert_eq!(line.quantity, 660);
        let marker = line.attributes.first().unwrap();
        assert_eq!(marker.key, DONATION_LINE_PROPERTY);
        assert_eq!(marker.value, "round_up");
    }

    #[test]
    fn test_fixed_donation_line() {
        let amount = Decimal::new(1250, 2);
        let line = donation_line(DONATION_VARIANT, amount, DonationSource::Fixed).unwrap();
        assert_eq!(line.quantity, 1250);
        assert_eq!(line.attributes.first().unwrap().value, "fixed");
    }

    #[test]
    fn test_zero_donation_adds_no_line() {
        assert!(donation_line(DONATION_VARIANT, Decimal::ZERO, DonationSource::RoundUp).is_none());
        assert!(donation_line(DONATION_VARIANT, Decimal::new(4, 3), DonationSource::Fixed).is_none());
    }

    #[test]
    fn test_empty_totals() {
        let totals = empty_totals();
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.donation, Decimal::ZERO);
    }
}
