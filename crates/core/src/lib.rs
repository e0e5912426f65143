//! Sundry Core - Shared types library.
//!
//! This crate provides common types used across all Sundry components:
//! - `storefront` - Public-facing e-commerce site and JSON API
//! - `cli` - Command-line tools for the cart and catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no storage. The cart's merge rule lives here so it can be tested
//! without any collaborators.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`cart`] - Cart line items, aggregates, and the reconciliation merge

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartItem, NewCartItem};
pub use types::*;
