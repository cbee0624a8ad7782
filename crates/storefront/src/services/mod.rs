//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Member accounts (password login, password reset)
//! - `pricing` - Cart totals from discount rules and member prices
//! - `promotions` - Influencer and affiliate code validation
//! - `email` - Transactional email over SMTP
//! - `translation` - Translation on demand through an LLM gateway
//! - `realtime` - Postgres change feed fanned out to SSE subscribers
//! - `webhooks` - Shopify webhook verification and order ingestion

pub mod auth;
pub mod email;
pub mod pricing;
pub mod promotions;
pub mod realtime;
pub mod translation;
pub mod webhooks;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use pricing::PricingService;
pub use promotions::{AppliedCode, PromoError, PromotionService};
pub use realtime::{ChangeEvent, FeedChannel, RealtimeHub};
pub use translation::{TranslationError, TranslationService};
pub use webhooks::{WebhookDelivery, WebhookError, WebhookOutcome, WebhookProcessor};
