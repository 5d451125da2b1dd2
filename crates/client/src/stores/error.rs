//! Store error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::payments::PaymentError;

/// Errors from [`SessionStore`](super::SessionStore) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The API call failed; carries the server payload when there was one.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs a logged-in user.
    #[error("no user is logged in")]
    NotLoggedIn,
}

impl SessionError {
    /// Message suitable for showing to the user.
    ///
    /// Prefers the server's own error message over the transport-level text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e
                .payload()
                .map_or_else(|| e.to_string(), ToString::to_string),
            Self::NotLoggedIn => self.to_string(),
        }
    }
}

/// Errors from [`CartStore`](super::CartStore) operations.
///
/// Everything except `Payment` is a validation failure: the cart was left
/// exactly as it was.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("{name} is not available")]
    OutOfStock { name: String },

    #[error("{name} is currently up for auction")]
    BiddingInProgress { name: String },

    #[error("{name} is reserved for the auction winner")]
    ReservedForWinner { name: String },

    #[error("maximum quantity for {name} is {max}")]
    MaxQuantityReached { name: String, max: u32 },

    #[error("maximum quantity is {max}")]
    QuantityExceedsStock { max: u32 },

    #[error("cart is empty")]
    EmptyCart,

    #[error("a checkout is already in progress")]
    CheckoutInProgress,

    #[error("checkout failed: {0}")]
    Payment(#[from] PaymentError),
}
