//! Contains the [MulAddHintHandler], which reveals the inputs of a [MulAddSession] on demand.

use crate::session::MulAddSession;
use alloy_primitives::B256;
use async_trait::async_trait;
use core::{fmt::Display, str::FromStr};
use pio_preimage::{
    errors::{PreimageOracleError, PreimageOracleResult},
    Hint, HintHandler, PreimageKey,
};
use pio_preimage_server::SharedKeyValueStore;
use thiserror::Error;
use tracing::{info, warn};

/// An unrecognized hint verb.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown hint type: {0}")]
pub struct HintParsingError(pub String);

/// The [MulAddHintType] enum is used to specify the type of hint that was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MulAddHintType {
    /// A hint that asks for the preimage of the pre-state hash.
    FetchState,
    /// A hint that asks for the preimage of the diff hash and of both halves of the diff.
    FetchDiff,
}

impl MulAddHintType {
    /// Encodes a hint of this type for `hash`.
    pub fn encode_with(&self, hash: B256) -> String {
        Hint::new(self.to_string(), hash).to_string()
    }
}

impl FromStr for MulAddHintType {
    type Err = HintParsingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fetch-state" => Ok(Self::FetchState),
            "fetch-diff" => Ok(Self::FetchDiff),
            _ => Err(HintParsingError(value.to_string())),
        }
    }
}

impl From<MulAddHintType> for &str {
    fn from(value: MulAddHintType) -> Self {
        match value {
            MulAddHintType::FetchState => "fetch-state",
            MulAddHintType::FetchDiff => "fetch-diff",
        }
    }
}

impl Display for MulAddHintType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s: &str = (*self).into();
        write!(f, "{}", s)
    }
}

/// A [HintHandler] that populates the store with the inputs of a [MulAddSession].
///
/// Only hints naming the session's own commitments have any effect. Every other hint is logged and
/// ignored, so the only errors this handler returns are store failures.
#[derive(Clone)]
pub struct MulAddHintHandler {
    kv_store: SharedKeyValueStore,
    session: MulAddSession,
}

impl core::fmt::Debug for MulAddHintHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MulAddHintHandler").field("session", &self.session).finish_non_exhaustive()
    }
}

impl MulAddHintHandler {
    /// Create a new [MulAddHintHandler] writing into `kv_store`.
    pub const fn new(kv_store: SharedKeyValueStore, session: MulAddSession) -> Self {
        Self { kv_store, session }
    }

    /// Stores each value under the `keccak256` key derived from it.
    async fn put_all(&self, values: &[Vec<u8>]) -> PreimageOracleResult<()> {
        let mut kv_store = self.kv_store.write().await;
        for value in values {
            kv_store
                .set(PreimageKey::for_keccak256_preimage(value).into(), value.clone())
                .map_err(|e| PreimageOracleError::Other(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl HintHandler for MulAddHintHandler {
    async fn handle_hint(&self, hint: Hint) -> PreimageOracleResult<()> {
        let hint_type = match hint.verb.parse::<MulAddHintType>() {
            Ok(hint_type) => hint_type,
            Err(e) => {
                warn!(target: "mul_add_handler", "Ignoring hint \"{hint}\": {e}");
                return Ok(());
            }
        };

        match hint_type {
            MulAddHintType::FetchState if hint.hash == self.session.pre_hash() => {
                info!(target: "mul_add_handler", "Handling state fetch");
                self.put_all(&[self.session.state.to_be_bytes().to_vec()]).await
            }
            MulAddHintType::FetchDiff if hint.hash == self.session.diff_hash() => {
                info!(target: "mul_add_handler", "Handling diff fetch");
                self.put_all(&[
                    self.session.diff(),
                    self.session.mul.to_be_bytes().to_vec(),
                    self.session.add.to_be_bytes().to_vec(),
                ])
                .await
            }
            _ => {
                warn!(target: "mul_add_handler", "Unknown {hint_type} hash {}", hint.hash);
                Ok(())
            }
        }
    }
}
