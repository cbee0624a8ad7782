//! Storefront domain models and session-stored types.

pub mod session;
pub mod user;

pub use session::{CurrentUser, DonationChoice, GuestWishlist, keys};
pub use user::User;
