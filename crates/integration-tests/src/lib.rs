//! Integration tests for Gavel.
//!
//! Each test starts an in-process stub of the marketplace API (an `axum`
//! router on `127.0.0.1:0`, nested under `/api`) and drives the real
//! [`Marketplace`] against it, with client state in a temporary directory.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gavel-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Login, restore from disk, logout, 401 handling
//! - `cart_checkout` - Cart persistence, simulated and remote checkout
//! - `catalogue` - Query strings, response shapes, category caching

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use gavel_client::api::{ApiClient, ApiError};
use gavel_client::payments::RemotePurchaseGateway;
use gavel_client::persistence::{FileStore, KeyValueStore, PersistedStore};
use gavel_client::{ClientConfig, Marketplace};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

/// Stub API server plus a client state directory, torn down on drop.
pub struct TestContext {
    pub api_url: Url,
    pub state: TempDir,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Serve `routes` under `/api` on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener or temp directory cannot be created.
    pub async fn new(routes: Router) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().nest("/api", routes);

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let api_url = Url::parse(&format!("http://{addr}/api")).map_err(std::io::Error::other)?;
        Ok(Self {
            api_url,
            state: tempfile::tempdir()?,
            server,
        })
    }

    /// Client configuration pointed at the stub, with instant payments.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_api(self.api_url.clone());
        config.state_dir = self.state.path().to_path_buf();
        config.checkout_delay = Duration::ZERO;
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// Open a fresh marketplace over the shared state directory.
    ///
    /// Opening twice simulates a restart: the second instance only sees what
    /// the first one persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open(&self) -> Result<Marketplace, ApiError> {
        Marketplace::open(self.config())
    }

    /// Like [`open`](Self::open), but checkout goes to the batch purchase
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open_with_remote_checkout(&self) -> Result<Marketplace, ApiError> {
        let config = self.config();
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.state_dir.clone()));
        let api = ApiClient::new(&config, PersistedStore::new(Arc::clone(&backend)))?;
        let payments = Arc::new(RemotePurchaseGateway::new(Arc::new(api)));
        Marketplace::with_payments(config, backend, payments)
    }

    /// Whether the state directory holds a file for `key`.
    #[must_use]
    pub fn has_record(&self, key: &str) -> bool {
        self.state.path().join(format!("{key}.json")).exists()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Collects values seen by stub handlers.
#[derive(Debug)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self(Arc::default())
    }
}

impl<T: Clone> Recorder<T> {
    pub fn push(&self, value: T) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A product as the backend sends it.
#[must_use]
pub fn product_json(id: &str, price: f64, stock: i64) -> Value {
    json!({
        "_id": id,
        "name": format!("Product {id}"),
        "description": "Solid oak, lightly used",
        "image": format!("https://img.example.com/{id}.jpg"),
        "currentPrice": price,
        "stock": stock,
        "category": "antiques",
        "isBidding": false
    })
}

/// A successful login response.
#[must_use]
pub fn login_json(token: &str, user_id: &str, role: &str) -> Value {
    json!({
        "message": "Login successful",
        "token": token,
        "userId": user_id,
        "role": role
    })
}
