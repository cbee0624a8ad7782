//! Business logic services for the back office.
//!
//! - `auth` - Admin sign-in, account creation and passwords
//! - `email` - Test sends of stored email templates

pub mod auth;
pub mod email;

pub use auth::{AdminAuthError, AdminAuthService};
pub use email::{EmailError, EmailService, RenderedTemplate};
