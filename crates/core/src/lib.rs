//! Gavel Core - Shared domain types for the marketplace client.
//!
//! This crate provides common types used across all Gavel components:
//! - `client` - Persisted session/cart stores and the marketplace API client
//! - `cli` - Command-line front end driving the stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no persistence, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs and emails, plus role and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
