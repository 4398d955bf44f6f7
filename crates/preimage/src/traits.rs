use crate::{
    errors::{ChannelResult, PreimageOracleResult},
    Hint, PreimageKey,
};
use async_trait::async_trait;

/// A [PreimageOracleClient] is a high-level interface to read data from the host, keyed by a
/// [PreimageKey].
#[async_trait]
pub trait PreimageOracleClient {
    /// Get the data corresponding to the currently set key from the host. Return the data in a new
    /// heap allocated `Vec<u8>`
    ///
    /// # Returns
    /// - `Ok(Vec<u8>)` if the data was successfully fetched from the host.
    /// - `Err(_)` if the data could not be fetched from the host.
    async fn get(&self, key: PreimageKey) -> PreimageOracleResult<Vec<u8>>;

    /// Get the data corresponding to the currently set key from the host. Writes the data into the
    /// provided buffer.
    ///
    /// # Returns
    /// - `Ok(())` if the data was successfully written into the buffer.
    /// - `Err(_)` if the data could not be written into the buffer.
    async fn get_exact(&self, key: PreimageKey, buf: &mut [u8]) -> PreimageOracleResult<()>;
}

/// A [HintWriterClient] is a high-level interface to the hint channel. It provides a way to write
/// hints to the host.
#[async_trait]
pub trait HintWriterClient {
    /// Write a hint to the host, blocking until all data has been written (and, in acknowledged
    /// mode, until the host has processed it).
    ///
    /// # Returns
    /// - `Ok(())` if the hint was successfully written to the host.
    /// - `Err(_)` if the hint could not be written to the host.
    async fn write(&self, hint: &str) -> PreimageOracleResult<()>;
}

/// A [PreimageOracleServer] is a high-level interface to accept read requests from the client and
/// write the preimage data to the client channel.
#[async_trait]
pub trait PreimageOracleServer {
    /// Get the next preimage request and return the response to the client.
    ///
    /// # Returns
    /// - `Ok(())` if the data was successfully written into the client channel.
    /// - `Err(_)` if the request could not be read or answered. A
    ///   [ChannelError::Closed](crate::errors::ChannelError::Closed) error means the channel was
    ///   closed between requests.
    async fn next_preimage_request<G>(&self, getter: &G) -> PreimageOracleResult<()>
    where
        G: PreimageGetter + Send + Sync;

    /// Closes the underlying channel, waking a pending [Self::next_preimage_request].
    fn close(&self);
}

/// A [HintReaderServer] is a high-level interface to read preimage hints from the
/// [HintWriterClient] and prepare them for consumption by the client program.
#[async_trait]
pub trait HintReaderServer {
    /// Get the next hint and hand it to the [HintHandler].
    ///
    /// # Returns
    /// - `Ok(())` if the hint was received. Malformed hints are dropped and still return `Ok`.
    /// - `Err(_)` if the hint framing could not be read or the handler failed.
    async fn next_hint<H>(&self, handler: &H) -> PreimageOracleResult<()>
    where
        H: HintHandler + Send + Sync;

    /// Closes the underlying channel, waking a pending [Self::next_hint].
    fn close(&self);
}

/// A [HintHandler] populates preimages in response to decoded hints.
///
/// Hints are advisory. Implementations must not fail on hints they do not understand; an error is
/// reserved for conditions that end the session, such as a store write failure.
#[async_trait]
pub trait HintHandler {
    /// Handles a decoded hint.
    async fn handle_hint(&self, hint: Hint) -> PreimageOracleResult<()>;
}

/// A [PreimageGetter] is a high-level interface to fetch preimages during preimage requests.
#[async_trait]
pub trait PreimageGetter {
    /// Get the preimage corresponding to the given key.
    ///
    /// # Returns
    /// - `Ok(Vec<u8>)` if the preimage was successfully fetched.
    /// - `Err(_)` if the preimage is unknown or could not be fetched.
    async fn get_preimage(&self, key: PreimageKey) -> PreimageOracleResult<Vec<u8>>;
}

/// A [Channel] is a high-level interface to read and write data to a counterparty.
#[async_trait]
pub trait Channel {
    /// Asynchronously read data from the channel into the provided buffer.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes read. `0` only for an empty `buf`.
    /// - `Err(_)` if the data could not be read.
    async fn read(&self, buf: &mut [u8]) -> ChannelResult<usize>;

    /// Asynchronously read exactly `buf.len()` bytes into `buf` from the channel.
    ///
    /// # Returns
    /// - `Ok(usize)` if the data was successfully read.
    /// - `Err(ChannelError::Closed)` if the channel closed before the first byte arrived.
    /// - `Err(ChannelError::UnexpectedEOF)` if the channel closed part way through.
    async fn read_exact(&self, buf: &mut [u8]) -> ChannelResult<usize>;

    /// Asynchronously write the provided buffer to the channel.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes written.
    /// - `Err(_)` if the data could not be written.
    async fn write(&self, buf: &[u8]) -> ChannelResult<usize>;

    /// Closes the channel. Pending and future reads and writes fail with
    /// [ChannelError::Closed](crate::errors::ChannelError::Closed).
    fn close(&self);
}
