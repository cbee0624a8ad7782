//! Greenleaf Core - Shared types and business rules.
//!
//! This crate provides the types used across all Greenleaf components:
//! - `storefront` - Public JSON API, checkout hand-off, and webhook receiver
//! - `admin` - Back-office API for promotions, pricing, and content
//! - `cli` - Command-line tools for migrations, admin users, and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`models`] - Database row models shared by storefront and admin
//! - [`pricing`] - Cart discount engine (volume tiers, bundles, member prices)
//! - [`donation`] - Round-up and fixed donation amounts
//! - [`promo`] - Affiliate and influencer code rules
//! - [`webhook`] - Shopify webhook topics and payloads
//! - [`template`] - `{{ placeholder }}` rendering for stored email templates
//! - [`secret`] - Startup checks for configured secrets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod donation;
pub mod models;
pub mod pricing;
pub mod promo;
pub mod secret;
pub mod template;
pub mod types;
pub mod webhook;

pub use types::*;
