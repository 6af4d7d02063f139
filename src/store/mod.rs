//! Local persistence.
//!
//! A small key-value layer scoped to one storefront profile. Values are
//! JSON-encoded strings and readers parse-and-default rather than trusting a
//! schema: a corrupt value reads as absent. A failed write means the
//! operation that triggered it is not committed, and callers must not assume
//! any state mutation took effect.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::DirStore;
pub use memory::MemoryStore;

/// Well-known persistence keys.
pub mod keys {
    /// The current cart, an ordered sequence of line items.
    pub const CART: &str = "cart";

    /// The current user profile record.
    pub const PROFILE: &str = "profile";

    /// The active session reference (profile id). Cleared on sign-out; the
    /// backing profile record stays.
    pub const SESSION: &str = "session";

    /// Legacy global order list, drained into the per-profile key on first
    /// load.
    pub const LEGACY_ORDERS: &str = "orders";

    /// Wallet account for a profile.
    pub fn wallet(profile_id: &str) -> String {
        format!("wallet:{profile_id}")
    }

    /// Wallet transaction log for a profile, newest first.
    pub fn wallet_transactions(profile_id: &str) -> String {
        format!("walletTransactions:{profile_id}")
    }

    /// Order history for a profile, newest first.
    pub fn orders(profile_id: &str) -> String {
        format!("orders:{profile_id}")
    }

    /// Saved photo references for a profile. Image bytes live with the
    /// external upload service; only references are stored here.
    pub fn saved_photos(profile_id: &str) -> String {
        format!("savedPhotos:{profile_id}")
    }
}

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying IO failure (quota exceeded, unreadable file, missing
    /// directory).
    #[error("storage unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for storage.
    #[error("failed to encode value for key {key}")]
    Encode {
        /// The key whose value failed to encode.
        key: String,

        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A key-value store scoped to the current browser profile.
///
/// Implementations only move strings; the JSON helpers below define the
/// single encoding every aggregate uses.
pub trait KeyValueStore {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write does not complete; the caller
    /// must treat the triggering operation as not committed.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Read and decode the JSON value under `key`.
    ///
    /// A value that fails to decode reads as absent, so callers can
    /// parse-and-default.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, %err, "discarding unreadable stored value");
                Ok(None)
            }
        }
    }

    /// Encode `value` as JSON and write it under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if encoding fails or the write does not
    /// complete.
    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_owned(),
            source,
        })?;

        self.set(key, &raw)
    }
}
