//! Supabase REST client (PostgREST data API and GoTrue auth API).
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared behind an `Arc`; the client is cheap to clone
//! - Every request carries the project's anon key as `apikey`; the bearer token
//!   is the signed-in user's access token when one is given, so row-level
//!   security applies per user
//! - Tables are addressed by name and filtered with [`Query`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sundry_storefront::supabase::{Query, SupabaseClient};
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//!
//! let products: Vec<Product> = client
//!     .select("products", &Query::new().order("name", true), None)
//!     .await?;
//!
//! client
//!     .delete("cart_items", &Query::new().eq("user_id", user.id), Some(token))
//!     .await?;
//! ```

pub mod auth;

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

pub use auth::{AuthSession, AuthUser, SignUpOutcome};

/// PostgREST error code for "requested a single row, got zero or many".
const SINGLE_ROW_MISMATCH: &str = "PGRST116";

/// Media type asking PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} {}{message}", format_code(.code.as_deref()))]
    Api {
        /// HTTP status code.
        status: u16,
        /// PostgREST / GoTrue error code, when the body carried one.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The configured project URL cannot be joined with an API path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SupabaseError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Filters, ordering and projection for a PostgREST request.
///
/// Rendered into URL query pairs, e.g. `select=*&user_id=eq.<id>&order=name.asc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// An empty query (all columns, no filter).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return, including embedded resources.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.pairs.push(("select".to_string(), columns.to_string()));
        self
    }

    /// Equality filter on `column`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.pairs
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Order by `column`.
    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.pairs
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    /// Return at most `count` rows.
    #[must_use]
    pub fn limit(mut self, count: usize) -> Self {
        self.pairs.push(("limit".to_string(), count.to_string()));
        self
    }

    fn apply(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (key, value) in &self.pairs {
            query.append_pair(key, value);
        }
    }
}

/// Error body shape shared by PostgREST and GoTrue (fields vary by service).
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_parts(self) -> (Option<String>, Option<String>) {
        let code = self.error_code.or_else(|| {
            self.code.and_then(|c| match c {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
        });
        let message = self
            .message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error);
        (code, message)
    }
}

/// Client for a Supabase project's REST APIs.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: Url,
    auth_url: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL is invalid or the HTTP client
    /// fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let base = config.url.as_str().trim_end_matches('/');
        let rest_url = Url::parse(&format!("{base}/rest/v1/"))?;
        let auth_url = Url::parse(&format!("{base}/auth/v1/"))?;

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(config.anon_key.expose_secret()) {
            headers.insert("apikey", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url,
                auth_url,
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    // =========================================================================
    // PostgREST
    // =========================================================================

    /// Select rows from `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows cannot be parsed.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        token: Option<&SecretString>,
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.table_url(table, query)?;
        let response = self.request(Method::GET, url, token).send().await?;
        parse_json(response).await
    }

    /// Select exactly one row from `table`.
    ///
    /// Returns `Ok(None)` when no row (or more than one) matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be parsed.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        token: Option<&SecretString>,
    ) -> Result<Option<T>, SupabaseError> {
        let url = self.table_url(table, query)?;
        let response = self
            .request(Method::GET, url, token)
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;

        match parse_json(response).await {
            Ok(row) => Ok(Some(row)),
            Err(err) if is_single_row_mismatch(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Insert `rows` into `table` without reading them back.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn insert<T: Serialize + Sync>(
        &self,
        table: &str,
        rows: &[T],
        token: Option<&SecretString>,
    ) -> Result<(), SupabaseError> {
        let url = self.table_url(table, &Query::new())?;
        let response = self
            .request(Method::POST, url, token)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        check_status(response).await.map(drop)
    }

    /// Insert one row into `table` and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be parsed.
    pub async fn insert_returning<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
        token: Option<&SecretString>,
    ) -> Result<R, SupabaseError> {
        let url = self.table_url(table, &Query::new())?;
        let response = self
            .request(Method::POST, url, token)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        parse_json(response).await
    }

    /// Patch the single row of `table` matched by `query` and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, no single row matched, or the
    /// row cannot be parsed.
    pub async fn update_returning<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        patch: &T,
        token: Option<&SecretString>,
    ) -> Result<R, SupabaseError> {
        let url = self.table_url(table, query)?;
        let response = self
            .request(Method::PATCH, url, token)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(patch)
            .send()
            .await?;
        parse_json(response).await
    }

    /// Delete every row of `table` matched by `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(
        &self,
        table: &str,
        query: &Query,
        token: Option<&SecretString>,
    ) -> Result<(), SupabaseError> {
        let url = self.table_url(table, query)?;
        let response = self.request(Method::DELETE, url, token).send().await?;
        check_status(response).await.map(drop)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn table_url(&self, table: &str, query: &Query) -> Result<Url, SupabaseError> {
        let mut url = self.inner.rest_url.join(table)?;
        query.apply(&mut url);
        Ok(url)
    }

    fn auth_endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.auth_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.inner.anon_key);
        self.inner.client.request(method, url).header(
            AUTHORIZATION,
            format!("Bearer {}", bearer.expose_secret()),
        )
    }
}

fn format_code(code: Option<&str>) -> String {
    code.map(|c| format!("[{c}] ")).unwrap_or_default()
}

fn is_single_row_mismatch(err: &SupabaseError) -> bool {
    match err {
        SupabaseError::Api { status, code, .. } => {
            code.as_deref() == Some(SINGLE_ROW_MISMATCH) || *status == 406
        }
        _ => false,
    }
}

/// Turn a non-success response into [`SupabaseError`].
async fn check_status(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(SupabaseError::RateLimited(retry_after));
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = serde_json::from_str::<ErrorBody>(&text)
        .map(ErrorBody::into_parts)
        .unwrap_or_default();

    tracing::debug!(
        status = %status,
        body = %text.chars().take(500).collect::<String>(),
        "Supabase returned non-success status"
    );

    Err(SupabaseError::Api {
        status: status.as_u16(),
        code,
        message: message.unwrap_or_else(|| text.chars().take(200).collect()),
    })
}

/// Check the status, then parse the body as JSON.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, SupabaseError> {
    let response = check_status(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse Supabase response"
        );
        SupabaseError::Parse(e)
    })
}
