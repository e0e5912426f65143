//! Integration tests for Sundry.
//!
//! # Running Tests
//!
//! ```bash
//! # Cart manager tests (no services needed)
//! cargo test -p sundry-integration-tests
//!
//! # Live storefront tests (start the server first)
//! STOREFRONT_TEST_URL=http://127.0.0.1:3000 \
//!     cargo test -p sundry-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_manager` - Cart manager behavior through the public API
//! - `storefront_api` - HTTP tests against a running storefront

use reqwest::Client;

/// Default address of a locally running storefront.
const DEFAULT_STOREFRONT_URL: &str = "http://127.0.0.1:3000";

/// Shared setup for live storefront tests.
pub struct TestContext {
    /// Client with a cookie store, so one context is one browser session.
    pub client: Client,
    /// Storefront base URL, without a trailing slash.
    pub storefront_url: String,
}

impl TestContext {
    /// Create a context for the storefront at `STOREFRONT_TEST_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let storefront_url = std::env::var("STOREFRONT_TEST_URL")
            .unwrap_or_else(|_| DEFAULT_STOREFRONT_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder().cookie_store(true).build()?;

        Ok(Self {
            client,
            storefront_url,
        })
    }

    /// Absolute URL for `path` on the storefront.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }
}
