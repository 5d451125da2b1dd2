//! Payment collaborators used by cart checkout.
//!
//! The cart store hands a [`PaymentRequest`] to whatever [`PaymentGateway`]
//! it was built with:
//!
//! - [`SimulatedPaymentGateway`] - waits a fixed delay, then approves
//! - [`RemotePurchaseGateway`] - submits the cart to the batch purchase endpoint

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gavel_core::PaymentMethod;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiError, ProductApi};
use crate::models::{BatchPurchaseRequest, CartItem};

/// Default delay of the simulated gateway.
pub const DEFAULT_CHECKOUT_DELAY: Duration = Duration::from_secs(2);

/// Errors from a payment collaborator.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What is being paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub method: PaymentMethod,
}

/// Successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Gateway-side reference for the charge.
    pub reference: String,
}

/// Collects payment for a checkout.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentConfirmation, PaymentError>;
}

/// Approves every charge after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    delay: Duration,
}

impl SimulatedPaymentGateway {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKOUT_DELAY)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    #[instrument(skip_all, fields(total = %request.total, method = %request.method))]
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentConfirmation, PaymentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(PaymentConfirmation {
            reference: format!("SIM-{}", uuid::Uuid::new_v4().simple()),
        })
    }
}

/// Submits the cart to `POST /products/purchase/batch`.
#[derive(Clone)]
pub struct RemotePurchaseGateway {
    api: Arc<dyn ProductApi>,
}

impl RemotePurchaseGateway {
    #[must_use]
    pub fn new(api: Arc<dyn ProductApi>) -> Self {
        Self { api }
    }
}

impl std::fmt::Debug for RemotePurchaseGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePurchaseGateway").finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for RemotePurchaseGateway {
    #[instrument(skip_all, fields(lines = request.items.len(), method = %request.method))]
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentConfirmation, PaymentError> {
        let body = BatchPurchaseRequest::from_items(&request.items, request.method);
        let ack = self.api.purchase_batch(&body).await?;

        let reference = ack
            .data
            .get("orderId")
            .or_else(|| ack.data.get("purchaseId"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| format!("REMOTE-{}", uuid::Uuid::new_v4().simple()), str::to_owned);

        info!(reference = %reference, "Batch purchase accepted");
        Ok(PaymentConfirmation { reference })
    }
}
