use crate::{
    errors::{ChannelError, PreimageOracleError, PreimageOracleResult},
    traits::{Channel, PreimageGetter},
    PreimageKey, PreimageOracleClient, PreimageOracleServer,
};
use alloy_primitives::B256;
use async_trait::async_trait;
use tracing::{debug, trace};

/// An [OracleReader] is a high-level interface to the preimage oracle channel.
#[derive(Debug, Clone)]
pub struct OracleReader<C> {
    channel: C,
}

impl<C> OracleReader<C>
where
    C: Channel,
{
    /// Create a new [OracleReader] from a [Channel].
    pub const fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Writes the preimage key to the host and blocks until the host has responded with the length
    /// of the preimage.
    async fn write_key(&self, key: PreimageKey) -> PreimageOracleResult<usize> {
        let key_bytes: [u8; 32] = key.into();
        self.channel.write(&key_bytes).await?;

        let mut length_buffer = [0u8; 8];
        self.channel.read_exact(&mut length_buffer).await?;
        usize::try_from(u64::from_be_bytes(length_buffer)).map_err(|_| {
            PreimageOracleError::Other("preimage length exceeds addressable memory".to_string())
        })
    }
}

#[async_trait]
impl<C> PreimageOracleClient for OracleReader<C>
where
    C: Channel + Send + Sync,
{
    async fn get(&self, key: PreimageKey) -> PreimageOracleResult<Vec<u8>> {
        trace!(target: "oracle_client", "Requesting data from preimage oracle. Key {key}");

        let length = self.write_key(key).await?;

        if length == 0 {
            return Ok(Default::default());
        }

        let mut data_buffer = vec![0; length];

        trace!(target: "oracle_client", "Reading data from preimage oracle. Key {key}");

        self.channel.read_exact(&mut data_buffer).await?;

        trace!(target: "oracle_client", "Successfully read data from preimage oracle. Key: {key}");

        Ok(data_buffer)
    }

    async fn get_exact(&self, key: PreimageKey, buf: &mut [u8]) -> PreimageOracleResult<()> {
        trace!(target: "oracle_client", "Requesting data from preimage oracle. Key {key}");

        let length = self.write_key(key).await?;

        if buf.len() != length {
            return Err(PreimageOracleError::BufferLengthMismatch(length, buf.len()));
        }

        if length == 0 {
            return Ok(());
        }

        self.channel.read_exact(buf).await?;

        trace!(target: "oracle_client", "Successfully read data from preimage oracle. Key: {key}");

        Ok(())
    }
}

/// An [OracleServer] is a router for the host to serve data back to the client [OracleReader].
///
/// Each request is a raw 32-byte [PreimageKey]; each response is the preimage length as a
/// big-endian `u64` followed by the preimage itself.
#[derive(Debug, Clone)]
pub struct OracleServer<C> {
    channel: C,
}

impl<C> OracleServer<C>
where
    C: Channel,
{
    /// Create a new [OracleServer] from a [Channel].
    pub const fn new(channel: C) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<C> PreimageOracleServer for OracleServer<C>
where
    C: Channel + Send + Sync,
{
    async fn next_preimage_request<G>(&self, getter: &G) -> PreimageOracleResult<()>
    where
        G: PreimageGetter + Send + Sync,
    {
        // Read the preimage request from the client, and throw early if there isn't any.
        let mut buf = [0u8; 32];
        self.channel.read_exact(&mut buf).await?;

        // A key that does not decode can never have been stored, so it is a miss like any other.
        let preimage_key = PreimageKey::try_from(buf).map_err(|_| {
            debug!(target: "oracle_server", "Request for undecodable key {}", B256::from(buf));
            PreimageOracleError::KeyNotFound
        })?;

        trace!(target: "oracle_server", "Fetching preimage for key {preimage_key}");

        let value = getter.get_preimage(preimage_key).await?;

        // Write the length as a big-endian u64 followed by the data, as a single frame. The
        // request has been consumed, so the channel closing now is no longer a clean close.
        let mut response = Vec::with_capacity(value.len() + 8);
        response.extend_from_slice(&(value.len() as u64).to_be_bytes());
        response.extend_from_slice(&value);
        self.channel.write(&response).await.map_err(|e| match e {
            ChannelError::Closed => ChannelError::UnexpectedEOF,
            e => e,
        })?;

        trace!(target: "oracle_server", "Successfully wrote preimage data for key {preimage_key}");

        Ok(())
    }

    fn close(&self) {
        self.channel.close();
    }
}
