//! Domain models for the storefront.
//!
//! Row types mirror the Supabase tables they are read from; the cart line
//! types live in `sundry-core`.

pub mod catalog;
pub mod order;
pub mod profile;
pub mod session;

pub use catalog::{Category, Product};
pub use order::{Order, OrderItem, OrderWithItems, ShippingDetails};
pub use profile::{Profile, ProfileUpdate};
pub use session::{CurrentUser, UserView, keys as session_keys};
