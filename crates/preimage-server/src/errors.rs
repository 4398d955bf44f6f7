//! Errors for the `pio-preimage-server` crate.

use alloy_primitives::B256;
use thiserror::Error;

/// A [KeyValueError] describes why a [KeyValueStore](crate::KeyValueStore) refused a write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyValueError {
    /// The write would push the store past its byte budget.
    #[error("Store limit of {limit} bytes exceeded, {requested} bytes requested.")]
    ResourceExhausted {
        /// The configured byte budget.
        limit: usize,
        /// The number of bytes the store would hold after the write.
        requested: usize,
    },
    /// The value does not hash to the content-addressed key it was written under.
    #[error("Value does not match the digest of key {0}.")]
    DigestMismatch(B256),
    /// The key does not carry a known key type.
    #[error("Invalid key {0}.")]
    InvalidKey(B256),
}
