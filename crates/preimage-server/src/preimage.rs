//! Contains the [KeyValueStore]-backed implementation of the [PreimageGetter] trait.
//!
//! [KeyValueStore]: crate::KeyValueStore

use crate::SharedKeyValueStore;
use async_trait::async_trait;
use pio_preimage::{
    errors::{PreimageOracleError, PreimageOracleResult},
    PreimageGetter, PreimageKey,
};
use tracing::debug;

/// A [KeyValueStore](crate::KeyValueStore)-backed implementation of the [PreimageGetter] trait.
/// Preimages are served only if they are already in the store.
#[derive(Clone)]
pub struct KvPreimageGetter {
    inner: SharedKeyValueStore,
}

impl KvPreimageGetter {
    /// Create a new [KvPreimageGetter] from the given [SharedKeyValueStore].
    pub const fn new(kv_store: SharedKeyValueStore) -> Self {
        Self { inner: kv_store }
    }
}

impl core::fmt::Debug for KvPreimageGetter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KvPreimageGetter").finish_non_exhaustive()
    }
}

#[async_trait]
impl PreimageGetter for KvPreimageGetter {
    async fn get_preimage(&self, key: PreimageKey) -> PreimageOracleResult<Vec<u8>> {
        let kv_store = self.inner.read().await;
        kv_store.get(key.into()).ok_or_else(|| {
            debug!(target: "preimage_server", "Preimage not found for key {key}");
            PreimageOracleError::KeyNotFound
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryKeyValueStore;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_get_preimage() {
        let kv_store: SharedKeyValueStore = Arc::new(RwLock::new(MemoryKeyValueStore::new()));
        let getter = KvPreimageGetter::new(Arc::clone(&kv_store));
        let key = PreimageKey::for_keccak256_preimage(b"hello");

        assert!(matches!(getter.get_preimage(key).await, Err(PreimageOracleError::KeyNotFound)));

        kv_store.write().await.set(key.into(), b"hello".to_vec()).unwrap();
        assert_eq!(getter.get_preimage(key).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_missing_key_is_deterministic() {
        let kv_store: SharedKeyValueStore = Arc::new(RwLock::new(MemoryKeyValueStore::new()));
        let getter = KvPreimageGetter::new(kv_store);
        let key = PreimageKey::local(7);

        for _ in 0..3 {
            assert!(matches!(
                getter.get_preimage(key).await,
                Err(PreimageOracleError::KeyNotFound)
            ));
        }
    }
}
