//! Sundry Storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused by the CLI.
//!
//! # Modules
//!
//! - [`cart`] - Cart manager with local and remote mirrors
//! - [`supabase`] - Data API and auth service client
//! - [`services`] - Catalog, auth, orders and profiles
//! - [`routes`] - JSON API handlers and the application router

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod supabase;
