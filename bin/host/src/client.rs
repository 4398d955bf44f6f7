//! The built-in client program, run in-process in native mode.
//!
//! The client reads the session's commitments and claim from the local keys, hints for the inputs
//! behind the commitments, and recomputes the claim from the revealed inputs.

use crate::{
    handler::MulAddHintType,
    session::{CLAIM_KEY, DIFF_HASH_KEY, PRE_HASH_KEY},
};
use alloy_primitives::B256;
use anyhow::{anyhow, ensure, Result};
use pio_preimage::{HintWriterClient, PreimageKey, PreimageOracleClient};
use tracing::info;

/// Runs the client program against the given oracle and hint channels.
///
/// ## Returns
/// - `Ok(())` if the claim matches the result computed from the revealed inputs.
/// - `Err(_)` if an input could not be fetched or verified, or the claim is wrong.
pub async fn run<O, H>(oracle: O, hints: H) -> Result<()>
where
    O: PreimageOracleClient + Send + Sync,
    H: HintWriterClient + Send + Sync,
{
    let pre_hash = get_b256(&oracle, PreimageKey::local(PRE_HASH_KEY)).await?;
    let diff_hash = get_b256(&oracle, PreimageKey::local(DIFF_HASH_KEY)).await?;
    let mut claim = [0u8; 8];
    oracle.get_exact(PreimageKey::local(CLAIM_KEY), &mut claim).await?;
    let claim = u64::from_be_bytes(claim);

    info!(target: "native_client", "Verifying claim {claim}");

    hints.write(&MulAddHintType::FetchState.encode_with(pre_hash)).await?;
    let state = get_u64(&oracle, pre_hash).await?;

    hints.write(&MulAddHintType::FetchDiff.encode_with(diff_hash)).await?;
    let diff = get_verified(&oracle, PreimageKey::keccak256(diff_hash)).await?;
    ensure!(diff.len() == 64, "diff has {} bytes, expected 64", diff.len());
    let mul = get_u64(&oracle, B256::from_slice(&diff[..32])).await?;
    let add = get_u64(&oracle, B256::from_slice(&diff[32..])).await?;

    let result = state.wrapping_mul(mul).wrapping_add(add);
    ensure!(result == claim, "claim mismatch: {state} * {mul} + {add} = {result}, claimed {claim}");

    info!(target: "native_client", "Claim verified: {state} * {mul} + {add} = {result}");
    Ok(())
}

/// Fetches a preimage and checks it against its key.
async fn get_verified<O>(oracle: &O, key: PreimageKey) -> Result<Vec<u8>>
where
    O: PreimageOracleClient + Send + Sync,
{
    let value = oracle.get(key).await?;
    ensure!(key.verify(&value), "preimage for key {key} does not match its digest");
    Ok(value)
}

/// Fetches a 32-byte local value.
async fn get_b256<O>(oracle: &O, key: PreimageKey) -> Result<B256>
where
    O: PreimageOracleClient + Send + Sync,
{
    let mut buf = B256::ZERO;
    oracle.get_exact(key, buf.as_mut_slice()).await?;
    Ok(buf)
}

/// Fetches the big-endian `u64` committed to by `hash`.
async fn get_u64<O>(oracle: &O, hash: B256) -> Result<u64>
where
    O: PreimageOracleClient + Send + Sync,
{
    let value = get_verified(oracle, PreimageKey::keccak256(hash)).await?;
    let bytes: [u8; 8] = value
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("value for {hash} has {} bytes, expected 8", value.len()))?;
    Ok(u64::from_be_bytes(bytes))
}
