//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared behind an `Arc`, cheap to clone
//! - The bearer token is read from persisted state on every request, so a
//!   login or logout in the session store is picked up without rewiring
//! - A 401 from any endpoint removes the persisted token (the session store
//!   then treats the leftover user/role as a partial session on next start)
//! - Category listings are cached in-process via `moka`
//!
//! # Endpoint groups
//!
//! - [`UserApi`] - registration, login/logout, admin user management
//! - [`ProductApi`] - catalogue, bidding, purchases
//! - Image upload helpers are inherent methods (see [`images`])
//!
//! The traits exist so the stores can be driven by fakes in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use gavel_client::api::{ApiClient, ProductApi, ProductQuery};
//!
//! let client = ApiClient::new(&config, store)?;
//! let page = client
//!     .list_products(&ProductQuery::new().category("antiques").limit(20))
//!     .await?;
//! ```

pub mod images;
mod products;
mod users;

pub use images::{ImageError, ImagePolicy, ImageUpload, UploadedImage};
pub use products::{ProductApi, ProductQuery};
pub use users::UserApi;

#[cfg(test)]
pub use products::MockProductApi;
#[cfg(test)]
pub use users::MockUserApi;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::models::AuthToken;
use crate::persistence::PersistedStore;

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the request with a structured error body.
    #[error("server error {status}: {payload}")]
    Server {
        status: StatusCode,
        payload: ErrorPayload,
    },

    /// The server rejected the request with a body that is not an error
    /// payload (HTML error page, plain text, empty).
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL could not be combined with a path.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status of the failure, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error body sent by the server, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Server { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether the server answered 401 (the persisted token is already gone).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

/// JSON error body returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, serde::Serialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ErrorPayload {
    /// Parse a body as an error payload; requires `message` or `error`.
    fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|p| p.message.is_some() || p.error.is_some())
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.message, &self.error) {
            (Some(message), _) => f.write_str(message),
            (None, Some(error)) => f.write_str(error),
            (None, None) => f.write_str("(no error details provided)"),
        }
    }
}

/// A single object that may arrive bare or wrapped (`{"product": {...}}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Single<T> {
    Bare(T),
    Wrapped {
        #[serde(alias = "product", alias = "user")]
        data: T,
    },
}

impl<T> Single<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Bare(value) | Self::Wrapped { data: value } => value,
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP client for the marketplace REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    store: PersistedStore,
    categories: Cache<&'static str, Vec<String>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API at `config.api_url`.
    ///
    /// `store` is where the session store persists the bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: PersistedStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let categories = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                store,
                categories,
            }),
        })
    }

    /// Base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str, query: &[(&'static str, String)]) -> Result<url::Url, ApiError> {
        let mut url = url::Url::parse(&format!("{}{path}", self.inner.base_url))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Start a request, attaching the bearer token when one is persisted.
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<RequestBuilder, ApiError> {
        let builder = self.inner.client.request(method, self.url(path, query)?);
        Ok(match self.inner.store.load::<AuthToken>() {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        })
    }

    /// Send a request and decode the JSON success body.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_owned();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %url, "API returned 401, dropping persisted token");
            self.inner.store.remove::<AuthToken>();
        }

        if !status.is_success() {
            debug!(
                status = %status,
                path = %url,
                body = %body.chars().take(200).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ErrorPayload::from_body(&body).map_or_else(
                || ApiError::Status {
                    status,
                    body: body.chars().take(200).collect(),
                },
                |payload| ApiError::Server { status, payload },
            ));
        }

        if body.trim().is_empty() {
            // Acknowledgement-only endpoints may answer 204 / empty 200
            return Ok(serde_json::from_value(serde_json::Value::Object(
                serde_json::Map::new(),
            ))?);
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path, &[])?).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::DELETE, path, &[])?).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path, &[])?.json(body))
            .await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path, &[])?.json(body))
            .await
    }
}

/// Percent-encode a single path segment.
fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

/// Default TTL for cached listings when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
