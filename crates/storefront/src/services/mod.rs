//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email/password accounts on the Supabase auth service
//! - `catalog` - Cached product and category reads
//! - `orders` - Order history and checkout
//! - `profiles` - Customer profile reads and updates
//!
//! The cart lives in [`crate::cart`]; these services never touch it directly.

pub mod auth;
pub mod catalog;
pub mod orders;
pub mod profiles;

pub use auth::{AuthError, AuthService, SignUpResult};
pub use catalog::CatalogService;
pub use orders::{OrderError, OrderService};
pub use profiles::ProfileService;
