//! Gavel Client - Marketplace client state and API access.
//!
//! This crate keeps a marketplace user's session and cart in durable
//! key-value storage and talks to the marketplace REST API.
//!
//! # Modules
//!
//! - [`persistence`] - Key-value backends and the versioned JSON record codec
//! - [`models`] - Wire and persisted models (products, cart lines, profiles)
//! - [`api`] - `reqwest` client for the marketplace endpoints
//! - [`payments`] - Payment collaborators used at checkout
//! - [`stores`] - Session and cart stores
//! - [`state`] - [`Marketplace`], bundling all of the above
//! - [`config`] - Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use gavel_client::{ClientConfig, Marketplace};
//!
//! let market = Marketplace::open(ClientConfig::from_env()?)?;
//! let product = market.api().get_product(&id).await?;
//! market.cart().add_to_cart(&product)?;
//! let receipt = market.cart().purchase_cart(PaymentMethod::Card).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod models;
pub mod payments;
pub mod persistence;
pub mod state;
pub mod stores;

pub use config::{ClientConfig, ConfigError};
pub use state::Marketplace;
