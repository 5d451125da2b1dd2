//! Shared marketplace context.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::config::ClientConfig;
use crate::payments::{PaymentGateway, SimulatedPaymentGateway};
use crate::persistence::{FileStore, KeyValueStore, PersistedStore};
use crate::stores::{CartStore, SessionStore};

/// One API client plus the session and cart stores, all over the same
/// storage backend.
///
/// This struct is cheaply cloneable via `Arc`; clones share state.
#[derive(Clone)]
pub struct Marketplace {
    inner: Arc<MarketplaceInner>,
}

struct MarketplaceInner {
    config: ClientConfig,
    api: ApiClient,
    session: SessionStore,
    cart: CartStore,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Build a context over `backend` with the simulated payment gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let payments = Arc::new(SimulatedPaymentGateway::new(config.checkout_delay));
        Self::with_payments(config, backend, payments)
    }

    /// Build a context over `backend` with a custom payment gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_payments(
        config: ClientConfig,
        backend: Arc<dyn KeyValueStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Result<Self, ApiError> {
        let store = PersistedStore::new(backend);
        let api = ApiClient::new(&config, store.clone())?;
        let session = SessionStore::new(store.clone(), Arc::new(api.clone()));
        let cart = CartStore::new(store, payments);

        Ok(Self {
            inner: Arc::new(MarketplaceInner {
                config,
                api,
                session,
                cart,
            }),
        })
    }

    /// Build a context persisting to files under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open(config: ClientConfig) -> Result<Self, ApiError> {
        let backend = Arc::new(FileStore::new(config.state_dir.clone()));
        Self::new(config, backend)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }
}
