//! Client-side state stores.
//!
//! - [`SessionStore`] - who is logged in, backed by the `token`, `user` and
//!   `role` records
//! - [`CartStore`] - cart line items backed by the `cart` record, plus checkout
//!
//! Both take `&self` everywhere and guard their state with a `RwLock`, so a
//! single instance can be shared between tasks. Locks are never held across
//! an `.await`. Each store is the only writer of its own records.

mod cart;
mod error;
mod session;

pub use cart::CartStore;
pub use error::{CartError, SessionError};
pub use session::{Session, SessionStore};
