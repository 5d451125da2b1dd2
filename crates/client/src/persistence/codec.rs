//! Typed, versioned JSON records over a [`KeyValueStore`].

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, warn};

use super::KeyValueStore;

/// A value with its own storage key and schema version.
///
/// Records are written as `{"version": N, "value": ...}`. Bump `VERSION`
/// whenever the encoded shape changes incompatibly: entries written under
/// another version are discarded on load instead of being misread.
pub trait Record: Serialize + DeserializeOwned {
    /// Storage key for this record.
    const KEY: &'static str;
    /// Schema version written alongside the value.
    const VERSION: u32;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    value: &'a T,
}

#[derive(Deserialize)]
struct RawEnvelope {
    version: u32,
    value: serde_json::Value,
}

/// Why a stored entry could not be turned back into a record.
#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
}

fn decode<R: Record>(raw: &str) -> Result<R, DecodeError> {
    let envelope: RawEnvelope = serde_json::from_str(raw)?;
    if envelope.version != R::VERSION {
        return Err(DecodeError::Version {
            found: envelope.version,
            expected: R::VERSION,
        });
    }
    Ok(serde_json::from_value(envelope.value)?)
}

fn encode<R: Record>(record: &R) -> Result<String, serde_json::Error> {
    serde_json::to_string(&EnvelopeRef {
        version: R::VERSION,
        value: record,
    })
}

/// Typed access to persisted records.
///
/// None of these operations fail outwardly:
///
/// - `load` treats unreadable, malformed or wrong-version entries as absent,
///   deleting corrupt ones so they do not resurface.
/// - `save` and `remove` log write failures and return; the caller's
///   in-memory state stays authoritative.
#[derive(Debug, Clone)]
pub struct PersistedStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistedStore {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// The raw backend this codec writes to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Load a record, self-healing corrupt entries.
    #[must_use]
    pub fn load<R: Record>(&self) -> Option<R> {
        let raw = match self.backend.get(R::KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = R::KEY, error = %e, "Failed to read persisted state");
                return None;
            }
        };

        match decode::<R>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = R::KEY, error = %e, "Discarding corrupt persisted state");
                self.remove::<R>();
                None
            }
        }
    }

    /// Persist a record, best effort.
    pub fn save<R: Record>(&self, record: &R) {
        let encoded = match encode(record) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(key = R::KEY, error = %e, "Failed to encode state for persistence");
                return;
            }
        };

        match self.backend.set(R::KEY, &encoded) {
            Ok(()) => debug!(key = R::KEY, bytes = encoded.len(), "Persisted state"),
            Err(e) => error!(key = R::KEY, error = %e, "Failed to persist state"),
        }
    }

    /// Delete a record, best effort.
    pub fn remove<R: Record>(&self) {
        if let Err(e) = self.backend.remove(R::KEY) {
            error!(key = R::KEY, error = %e, "Failed to remove persisted state");
        }
    }
}
