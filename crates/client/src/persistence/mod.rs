//! Durable key-value persistence for client state.
//!
//! # Layers
//!
//! - [`KeyValueStore`] - raw string storage keyed by name
//! - [`PersistedStore`] - typed, versioned JSON records on top of a backend
//!
//! Backends only move strings around. Everything about JSON, schema
//! versions and corruption recovery lives in the codec so it can be tested
//! without touching a disk.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, used by tests and embedders
//! - [`FileStore`] - one file per key inside a state directory

mod codec;
mod file;
mod memory;

pub use codec::{PersistedStore, Record};
pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a storage backend.
///
/// These never escape [`PersistedStore`]; the codec logs them and carries on
/// with in-memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend refused the write (e.g. a size quota).
    #[error("quota exceeded writing {key}: {size} bytes > {limit} bytes")]
    QuotaExceeded { key: String, size: usize, limit: usize },

    /// Key contains characters the backend cannot represent.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Raw string key-value storage.
///
/// Implementations must be safe to share between the session store, the
/// cart store and the API client, which all hold the same backend.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
