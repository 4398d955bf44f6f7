//! This module contains the [KeyValueStore] trait and concrete implementations of it.

use crate::KeyValueError;
use alloy_primitives::B256;
use pio_preimage::PreimageKey;
use std::sync::Arc;
use tokio::sync::RwLock;

mod mem;
pub use mem::MemoryKeyValueStore;

/// A type alias for a shared key-value store.
pub type SharedKeyValueStore = Arc<RwLock<dyn KeyValueStore + Send + Sync>>;

/// Describes the interface of a simple, synchronous key-value store.
pub trait KeyValueStore {
    /// Get the value associated with the given key.
    fn get(&self, key: B256) -> Option<Vec<u8>>;

    /// Set the value associated with the given key, replacing any previous value.
    fn set(&mut self, key: B256, value: Vec<u8>) -> Result<(), KeyValueError>;

    /// Returns the number of entries in the store.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks that `value` may be stored under `key`. Local keys accept any value; digest keys only
/// accept the value they were derived from.
pub(crate) fn verify_entry(key: B256, value: &[u8]) -> Result<(), KeyValueError> {
    let preimage_key = PreimageKey::try_from(key).map_err(|_| KeyValueError::InvalidKey(key))?;
    if preimage_key.verify(value) {
        Ok(())
    } else {
        Err(KeyValueError::DigestMismatch(key))
    }
}
