//! Contains a concrete implementation of the [KeyValueStore] trait that stores data in memory.

use super::{verify_entry, KeyValueStore};
use crate::KeyValueError;
use alloy_primitives::B256;
use std::collections::HashMap;
use tracing::trace;

/// The number of bytes each key counts against the budget.
const KEY_SIZE: usize = 32;

/// A simple, synchronous key-value store that stores data in memory.
///
/// The store may be given a byte budget, counting 32 bytes per key plus the length of each value.
/// Writes that would exceed the budget are refused and leave the store unchanged.
#[derive(Default, Clone, Debug, Eq, PartialEq)]
pub struct MemoryKeyValueStore {
    store: HashMap<B256, Vec<u8>>,
    limit: Option<usize>,
    used: usize,
}

impl MemoryKeyValueStore {
    /// Create a new, unbounded [MemoryKeyValueStore] with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [MemoryKeyValueStore] that holds at most `limit` bytes.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Default::default() }
    }

    /// Returns the number of bytes currently accounted against the budget.
    pub const fn used_bytes(&self) -> usize {
        self.used
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: B256) -> Option<Vec<u8>> {
        self.store.get(&key).cloned()
    }

    fn set(&mut self, key: B256, value: Vec<u8>) -> Result<(), KeyValueError> {
        verify_entry(key, &value)?;

        let freed = self.store.get(&key).map_or(0, |old| KEY_SIZE + old.len());
        let requested = self.used - freed + KEY_SIZE + value.len();
        if let Some(limit) = self.limit {
            if requested > limit {
                return Err(KeyValueError::ResourceExhausted { limit, requested });
            }
        }

        trace!(target: "kv", "Storing {} bytes under key {key}", value.len());
        self.store.insert(key, value);
        self.used = requested;
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::keccak256;
    use pio_preimage::PreimageKey;
    use proptest::prelude::*;

    fn keccak_key(value: &[u8]) -> B256 {
        PreimageKey::for_keccak256_preimage(value).into()
    }

    proptest! {
        #[test]
        fn test_keccak_round_trip(value in prop::collection::vec(any::<u8>(), 0..512)) {
            let mut kv = MemoryKeyValueStore::new();
            let key = keccak_key(&value);

            kv.set(key, value.clone()).unwrap();
            prop_assert_eq!(kv.get(key), Some(value));
        }

        #[test]
        fn test_local_last_write_wins(index in any::<u64>(), a in any::<Vec<u8>>(), b in any::<Vec<u8>>()) {
            let mut kv = MemoryKeyValueStore::new();
            let key: B256 = PreimageKey::local(index).into();

            kv.set(key, a).unwrap();
            kv.set(key, b.clone()).unwrap();
            prop_assert_eq!(kv.get(key), Some(b));
            prop_assert_eq!(kv.len(), 1);
        }
    }

    #[test]
    fn test_digest_mismatch_rejected() {
        let mut kv = MemoryKeyValueStore::new();
        let key = keccak_key(b"expected");

        let err = kv.set(key, b"something else".to_vec()).unwrap_err();
        assert_eq!(err, KeyValueError::DigestMismatch(key));
        assert!(kv.is_empty());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut kv = MemoryKeyValueStore::new();
        let mut key = keccak256(b"abc");
        key[0] = 0x07;

        assert_eq!(kv.set(key, b"abc".to_vec()), Err(KeyValueError::InvalidKey(key)));
    }

    #[test]
    fn test_capacity_limit() {
        let mut kv = MemoryKeyValueStore::with_capacity_limit(100);
        let a: B256 = PreimageKey::local(0).into();
        let b: B256 = PreimageKey::local(1).into();

        kv.set(a, vec![0; 60]).unwrap();
        assert_eq!(kv.used_bytes(), 92);

        let err = kv.set(b, vec![0; 1]).unwrap_err();
        assert_eq!(err, KeyValueError::ResourceExhausted { limit: 100, requested: 125 });
        assert_eq!(kv.get(b), None);

        // Overwrites only count the difference in size.
        kv.set(a, vec![1; 68]).unwrap();
        assert_eq!(kv.used_bytes(), 100);
        assert!(kv.set(a, vec![1; 69]).is_err());
        assert_eq!(kv.get(a), Some(vec![1; 68]));

        kv.set(a, Vec::new()).unwrap();
        assert_eq!(kv.used_bytes(), 32);
    }
}
