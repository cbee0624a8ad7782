//! Domain models for the back office.
//!
//! Store data (promotions, pricing, content) uses the row models shared in
//! `greenleaf_core::models`; only admin accounts are defined here.

pub mod admin_user;
pub mod session;

pub use admin_user::{AdminRole, AdminUser};
pub use session::{CurrentAdmin, keys};
