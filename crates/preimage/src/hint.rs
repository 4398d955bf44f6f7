use crate::{
    errors::{ChannelError, HintParseError, PreimageOracleError, PreimageOracleResult},
    traits::{HintHandler, HintWriterClient},
    Channel, HintReaderServer,
};
use alloy_primitives::{hex, B256};
use async_trait::async_trait;
use tracing::{debug, error, trace};

/// The default upper bound on the declared length of a single hint, in bytes.
pub const MAX_HINT_SIZE: usize = 1024 * 1024;

/// The acknowledgement byte written back to the client after a hint is processed.
const HINT_ACK: u8 = 0x00;

/// A decoded hint of the form `<verb> <hex-encoded 32-byte hash>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hint {
    /// The hint verb, e.g. `fetch-state`.
    pub verb: String,
    /// The hash the hint refers to.
    pub hash: B256,
}

impl Hint {
    /// Creates a new [Hint].
    pub fn new(verb: impl Into<String>, hash: B256) -> Self {
        Self { verb: verb.into(), hash }
    }

    /// Decodes a raw hint string.
    ///
    /// The string must split on single spaces into exactly two tokens, and the second token must
    /// be exactly 64 hex characters (either case, no `0x` prefix).
    pub fn parse(raw: &str) -> Result<Self, HintParseError> {
        let parts = raw.split(' ').collect::<Vec<_>>();
        let [verb, hash] = parts.as_slice() else {
            return Err(HintParseError::TokenCount(parts.len()));
        };

        let bytes = hex::decode(hash).map_err(|_| HintParseError::InvalidHex)?;
        if hash.len() != 64 || bytes.len() != 32 {
            return Err(HintParseError::InvalidLength(hash.len()));
        }

        Ok(Self::new(*verb, B256::from_slice(&bytes)))
    }
}

impl core::fmt::Display for Hint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.verb, hex::encode(self.hash))
    }
}

/// A [HintWriter] is a high-level interface to the hint channel. It provides a way to write hints
/// to the host.
#[derive(Debug, Clone)]
pub struct HintWriter<C> {
    channel: C,
    ack: bool,
}

impl<C> HintWriter<C> {
    /// Create a new [HintWriter] from a [Channel]. The writer does not wait for acknowledgements.
    pub const fn new(channel: C) -> Self {
        Self { channel, ack: false }
    }

    /// Sets whether the writer waits for the host's one-byte acknowledgement after each hint. Must
    /// match the [HintReader] on the other end.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }
}

#[async_trait]
impl<C> HintWriterClient for HintWriter<C>
where
    C: Channel + Send + Sync,
{
    async fn write(&self, hint: &str) -> PreimageOracleResult<()> {
        trace!(target: "hint_writer", "Writing hint \"{hint}\"");

        // An 8-byte big-endian length prefix followed by the hint string.
        let mut hint_bytes = Vec::with_capacity(hint.len() + 8);
        hint_bytes.extend_from_slice(&(hint.len() as u64).to_be_bytes());
        hint_bytes.extend_from_slice(hint.as_bytes());
        self.channel.write(&hint_bytes).await?;

        trace!(target: "hint_writer", "Successfully wrote hint");

        if self.ack {
            let mut hint_ack = [0u8; 1];
            self.channel.read_exact(&mut hint_ack).await?;

            trace!(target: "hint_writer", "Received hint acknowledgement");
        }

        Ok(())
    }
}

/// A [HintReader] is a router for hints sent by the [HintWriter] from the client program. It
/// decodes each hint and hands it to a [HintHandler], which prepares preimages for reading.
#[derive(Debug, Clone)]
pub struct HintReader<C> {
    channel: C,
    ack: bool,
    max_hint_size: usize,
}

impl<C> HintReader<C>
where
    C: Channel,
{
    /// Create a new [HintReader] from a [Channel]. No acknowledgements are written and hints are
    /// limited to [MAX_HINT_SIZE] bytes.
    pub const fn new(channel: C) -> Self {
        Self { channel, ack: false, max_hint_size: MAX_HINT_SIZE }
    }

    /// Sets whether a one-byte acknowledgement is written back after each hint, including hints
    /// that were dropped.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    /// Sets the largest hint length accepted before the stream is considered corrupt.
    pub fn with_max_hint_size(mut self, max_hint_size: usize) -> Self {
        self.max_hint_size = max_hint_size;
        self
    }

    async fn acknowledge(&self) -> PreimageOracleResult<()> {
        if self.ack {
            self.channel.write(&[HINT_ACK]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C> HintReaderServer for HintReader<C>
where
    C: Channel + Send + Sync,
{
    async fn next_hint<H>(&self, handler: &H) -> PreimageOracleResult<()>
    where
        H: HintHandler + Send + Sync,
    {
        // Read the length of the raw hint payload.
        let mut len_buf = [0u8; 8];
        self.channel.read_exact(&mut len_buf).await?;
        let len = u64::from_be_bytes(len_buf);
        if len > self.max_hint_size as u64 {
            return Err(PreimageOracleError::HintTooLarge(len, self.max_hint_size));
        }

        // Read the raw hint payload. The length prefix has been consumed, so running out of data
        // here is a framing error rather than a clean close.
        let mut raw_payload = vec![0u8; len as usize];
        self.channel.read_exact(&mut raw_payload).await.map_err(|e| match e {
            ChannelError::Closed => ChannelError::UnexpectedEOF,
            e => e,
        })?;

        let payload = match String::from_utf8(raw_payload) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(target: "hint_reader", "Dropping hint with invalid UTF-8: {e}");
                return self.acknowledge().await;
            }
        };

        trace!(target: "hint_reader", "Successfully read hint: \"{payload}\"");

        match Hint::parse(&payload) {
            Ok(hint) => {
                if let Err(e) = handler.handle_hint(hint).await {
                    error!(target: "hint_reader", "Failed to handle hint: {e}");

                    // Write back on error to prevent blocking the client. The handler's error is
                    // the one the session ends with.
                    if let Err(ack_err) = self.acknowledge().await {
                        debug!(target: "hint_reader", "Failed to acknowledge hint: {ack_err}");
                    }
                    return Err(e);
                }
            }
            Err(e) => debug!(target: "hint_reader", "Dropping malformed hint \"{payload}\": {e}"),
        }

        self.acknowledge().await?;

        trace!(target: "hint_reader", "Successfully handled hint");

        Ok(())
    }

    fn close(&self) {
        self.channel.close();
    }
}
