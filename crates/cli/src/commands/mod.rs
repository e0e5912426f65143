//! Subcommand implementations.

pub mod cart;
pub mod products;

use thiserror::Error;

use sundry_storefront::cart::CartError;
use sundry_storefront::config::{ConfigError, SupabaseConfig};
use sundry_storefront::services::AuthError;
use sundry_storefront::supabase::{SupabaseClient, SupabaseError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A Supabase request failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Signing in failed.
    #[error("Sign-in failed: {0}")]
    Auth(#[from] AuthError),

    /// The remote cart could not be synced.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// The requested product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(sundry_core::ProductId),
}

/// Build a Supabase client from the environment (and `.env`).
fn supabase_client() -> Result<SupabaseClient, CommandError> {
    dotenvy::dotenv().ok();
    let config = SupabaseConfig::from_env()?;
    Ok(SupabaseClient::new(&config)?)
}
