//! Native implementations of the [Channel] trait, backed by [tokio]'s async I/O primitives.

use crate::{
    errors::{ChannelError, ChannelResult},
    Channel,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    io::{
        self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf,
        WriteHalf,
    },
    sync::{watch, Mutex, MutexGuard},
};

/// One end of an in-process [BidirectionalChannel].
pub type NativeChannel = IoChannel<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// A bidirectional channel, allowing for synchronized communication between two parties in the
/// same process.
#[derive(Debug)]
pub struct BidirectionalChannel {
    /// The client handle of the channel.
    pub client: NativeChannel,
    /// The host handle of the channel.
    pub host: NativeChannel,
}

impl BidirectionalChannel {
    /// The default number of bytes buffered in each direction.
    pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

    /// Creates a [BidirectionalChannel] that buffers up to `max_buf_size` bytes in each direction
    /// before writers wait for the reader.
    pub fn new(max_buf_size: usize) -> Self {
        let (client, host) = io::duplex(max_buf_size);
        let (client_read, client_write) = io::split(client);
        let (host_read, host_write) = io::split(host);

        Self {
            client: IoChannel::new(client_read, client_write),
            host: IoChannel::new(host_read, host_write),
        }
    }
}

impl Default for BidirectionalChannel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUFFER_SIZE)
    }
}

/// A [Channel] over an [AsyncRead] and [AsyncWrite] pair.
///
/// Clones share the underlying streams and the close signal. Once [Channel::close] is called, any
/// pending or future operation on any clone fails with [ChannelError::Closed].
#[derive(Debug)]
pub struct IoChannel<R, W> {
    reader: Arc<Mutex<R>>,
    writer: Arc<Mutex<W>>,
    closed: Arc<watch::Sender<bool>>,
}

impl<R, W> Clone for IoChannel<R, W> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            writer: Arc::clone(&self.writer),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<R, W> IoChannel<R, W> {
    /// Creates a new [IoChannel] from a reader and a writer.
    pub fn new(reader: R, writer: W) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
            closed: Arc::new(closed),
        }
    }

    /// Returns `true` if [Channel::close] has been called on this channel or any of its clones.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the channel has been closed.
    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // Only errors if the sender is dropped, and `self` holds it.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Locks `mutex`, giving up if the channel is closed first.
    async fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> ChannelResult<MutexGuard<'a, T>> {
        tokio::select! {
            biased;
            _ = self.closed() => Err(ChannelError::Closed),
            guard = mutex.lock() => Ok(guard),
        }
    }
}

impl<R, W> IoChannel<R, W>
where
    R: AsyncRead + Unpin,
{
    async fn read_chunk(&self, reader: &mut R, buf: &mut [u8]) -> ChannelResult<usize> {
        tokio::select! {
            biased;
            _ = self.closed() => Err(ChannelError::Closed),
            res = reader.read(buf) => res.map_err(ChannelError::from),
        }
    }
}

#[async_trait]
impl<R, W> Channel for IoChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read(&self, buf: &mut [u8]) -> ChannelResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut reader = self.lock(&self.reader).await?;
        match self.read_chunk(&mut reader, buf).await? {
            0 => Err(ChannelError::Closed),
            n => Ok(n),
        }
    }

    async fn read_exact(&self, buf: &mut [u8]) -> ChannelResult<usize> {
        let mut reader = self.lock(&self.reader).await?;

        let mut read = 0;
        while read < buf.len() {
            match self.read_chunk(&mut reader, &mut buf[read..]).await? {
                0 if read == 0 => return Err(ChannelError::Closed),
                0 => return Err(ChannelError::UnexpectedEOF),
                n => read += n,
            }
        }

        Ok(read)
    }

    async fn write(&self, buf: &[u8]) -> ChannelResult<usize> {
        let mut writer = self.lock(&self.writer).await?;

        tokio::select! {
            biased;
            _ = self.closed() => Err(ChannelError::Closed),
            res = async {
                writer.write_all(buf).await?;
                writer.flush().await
            } => res.map(|_| buf.len()).map_err(ChannelError::from),
        }
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_read_exact_spans_writes() {
        let chan = BidirectionalChannel::default();

        chan.client.write(&[1, 2, 3]).await.unwrap();
        chan.client.write(&[4, 5]).await.unwrap();

        let mut buf = [0u8; 5];
        assert_eq!(chan.host.read_exact(&mut buf).await.unwrap(), 5);
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_wakes_blocked_read() {
        let chan = BidirectionalChannel::default();
        let host = chan.host.clone();

        let reader = tokio::task::spawn(async move {
            let mut buf = [0u8; 32];
            host.read_exact(&mut buf).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        chan.host.close();

        let res = timeout(Duration::from_secs(5), reader).await.unwrap().unwrap();
        assert!(matches!(res, Err(ChannelError::Closed)));
        assert!(chan.host.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_operations_after_close() {
        let chan = BidirectionalChannel::default();
        chan.client.write(&[0xFF; 4]).await.unwrap();
        chan.host.close();

        let mut buf = [0u8; 4];
        assert!(matches!(chan.host.read_exact(&mut buf).await, Err(ChannelError::Closed)));
        assert!(matches!(chan.host.write(&buf).await, Err(ChannelError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_peer_drop_between_messages() {
        let BidirectionalChannel { client, host } = BidirectionalChannel::default();
        drop(client);

        let mut buf = [0u8; 8];
        assert!(matches!(host.read_exact(&mut buf).await, Err(ChannelError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_peer_drop_mid_message() {
        let BidirectionalChannel { client, host } = BidirectionalChannel::default();
        client.write(&[1, 2, 3]).await.unwrap();
        drop(client);

        let mut buf = [0u8; 8];
        assert!(matches!(host.read_exact(&mut buf).await, Err(ChannelError::UnexpectedEOF)));
    }
}
