//! Contains the [MulAddSession], the state a host session is bootstrapped with.

use alloy_primitives::{keccak256, B256};
use pio_preimage::PreimageKey;
use pio_preimage_server::{KeyValueError, KeyValueStore};
use tracing::info;

/// The local key index of the pre-state hash, `keccak256(be64(state))`.
pub const PRE_HASH_KEY: u64 = 0;

/// The local key index of the diff hash, `keccak256(diff)`.
pub const DIFF_HASH_KEY: u64 = 1;

/// The local key index of the claimed result, `be64(state * mul + add)`.
pub const CLAIM_KEY: u64 = 2;

/// A multiply-add session. The host commits to the inputs by hash and claims the result up front;
/// the inputs themselves are only revealed through hints.
///
/// The commitments are:
/// - `pre_hash = keccak256(be64(state))`
/// - `diff = keccak256(be64(mul)) || keccak256(be64(add))`
/// - `diff_hash = keccak256(diff)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulAddSession {
    /// The starting state.
    pub state: u64,
    /// The multiplier.
    pub mul: u64,
    /// The addend.
    pub add: u64,
}

impl Default for MulAddSession {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl MulAddSession {
    /// The session served when no inputs are configured.
    pub const DEFAULT: Self = Self::new(1000, 3, 4);

    /// Creates a new [MulAddSession].
    pub const fn new(state: u64, mul: u64, add: u64) -> Self {
        Self { state, mul, add }
    }

    /// Returns the commitment to the starting state.
    pub fn pre_hash(&self) -> B256 {
        keccak256(self.state.to_be_bytes())
    }

    /// Returns the concatenated commitments to the multiplier and the addend.
    pub fn diff(&self) -> Vec<u8> {
        let mut diff = keccak256(self.mul.to_be_bytes()).to_vec();
        diff.extend_from_slice(keccak256(self.add.to_be_bytes()).as_slice());
        diff
    }

    /// Returns the commitment to [Self::diff].
    pub fn diff_hash(&self) -> B256 {
        keccak256(self.diff())
    }

    /// Returns the claimed result, `state * mul + add` with wrapping arithmetic.
    pub const fn claim(&self) -> u64 {
        self.state.wrapping_mul(self.mul).wrapping_add(self.add)
    }

    /// Writes the session's local keys into `kv_store`.
    pub fn bootstrap<KV>(&self, kv_store: &mut KV) -> Result<(), KeyValueError>
    where
        KV: KeyValueStore + ?Sized,
    {
        kv_store.set(PreimageKey::local(PRE_HASH_KEY).into(), self.pre_hash().to_vec())?;
        kv_store.set(PreimageKey::local(DIFF_HASH_KEY).into(), self.diff_hash().to_vec())?;
        kv_store.set(PreimageKey::local(CLAIM_KEY).into(), self.claim().to_be_bytes().to_vec())?;

        info!("Bootstrapped session with pre-state {} and claim {}", self.pre_hash(), self.claim());
        Ok(())
    }
}
