//! Domain and wire models for the marketplace client.
//!
//! - [`user`] - Tokens, credentials, profiles, login responses
//! - [`product`] - Products, bids, listing pages
//! - [`cart`] - Cart line items and purchase records
//!
//! Types that the stores persist implement
//! [`Record`](crate::persistence::Record); their storage keys live in
//! [`keys`].

pub mod cart;
pub mod product;
pub mod user;

pub use cart::{
    BatchPurchaseRequest, CartItem, PurchaseLine, PurchaseReceipt, PurchaseRecord, PurchaseRequest,
};
pub use product::{Bid, BidRequest, Listing, Pagination, Product, ProductInput, ProductPage};
pub use user::{AuthToken, Credentials, LoginResponse, Registration, UserProfile};

use serde::{Deserialize, Serialize};

/// Storage keys for persisted client state.
pub mod keys {
    /// Bearer token of the logged-in user.
    pub const TOKEN: &str = "token";

    /// Profile of the logged-in user.
    pub const USER: &str = "user";

    /// Role of the logged-in user.
    pub const ROLE: &str = "role";

    /// Cart line items.
    pub const CART: &str = "cart";
}

/// Loose acknowledgement body returned by mutating endpoints.
///
/// The backend answers deletes, promotions and bids with a message plus
/// endpoint-specific fields; the extra fields are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A backend document carried neither `_id` nor `id`.
#[derive(Debug, thiserror::Error)]
#[error("missing field `_id`")]
pub struct MissingId;

/// Resolve a document's id from its `_id` and `id` fields, preferring `_id`.
fn document_id<T>(document_id: Option<T>, id: Option<T>) -> Result<T, MissingId> {
    document_id.or(id).ok_or(MissingId)
}
