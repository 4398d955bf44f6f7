//! This module contains the [PreimageServer] struct and its implementation.

use anyhow::{anyhow, Result};
use pio_preimage::{HintHandler, HintReaderServer, PreimageGetter, PreimageOracleServer};
use std::{future::Future, sync::Arc};
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info};

/// The loop that ended a session.
enum Trigger {
    Oracle(Result<Result<()>, task::JoinError>),
    Hint(Result<Result<()>, task::JoinError>),
    Shutdown,
}

/// The [PreimageServer] is responsible for waiting for incoming preimage requests and hints and
/// serving them to the client.
///
/// The two channels are served by independent tasks. The session ends as soon as one of them
/// finishes or the shutdown signal fires; both channels are then closed and the remaining task is
/// awaited before returning.
#[derive(Debug)]
pub struct PreimageServer<P, H, G, R> {
    /// The oracle server.
    oracle_server: Arc<P>,
    /// The hint reader.
    hint_reader: Arc<H>,
    /// Serves preimage requests.
    getter: Arc<G>,
    /// Populates preimages in response to hints.
    hint_handler: Arc<R>,
}

impl<P, H, G, R> PreimageServer<P, H, G, R>
where
    P: PreimageOracleServer + Send + Sync + 'static,
    H: HintReaderServer + Send + Sync + 'static,
    G: PreimageGetter + Send + Sync + 'static,
    R: HintHandler + Send + Sync + 'static,
{
    /// Create a new [PreimageServer] with the given [PreimageOracleServer], [HintReaderServer],
    /// [PreimageGetter] and [HintHandler].
    pub fn new(oracle_server: P, hint_reader: H, getter: Arc<G>, hint_handler: Arc<R>) -> Self {
        Self {
            oracle_server: Arc::new(oracle_server),
            hint_reader: Arc::new(hint_reader),
            getter,
            hint_handler,
        }
    }

    /// Starts the [PreimageServer] and waits for the session to end.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Starts the [PreimageServer] and waits for the session to end or for `shutdown` to resolve.
    ///
    /// ## Returns
    /// - `Ok(())` if a channel was closed by the client or the shutdown signal fired.
    /// - `Err(_)` if the loop that ended the session failed.
    pub async fn start_with_shutdown<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let mut oracle_task = task::spawn(Self::start_oracle_server(
            Arc::clone(&self.oracle_server),
            self.getter,
        ));
        let mut hint_task =
            task::spawn(Self::start_hint_router(Arc::clone(&self.hint_reader), self.hint_handler));

        tokio::pin!(shutdown);
        let trigger = tokio::select! {
            res = &mut oracle_task => Trigger::Oracle(res),
            res = &mut hint_task => Trigger::Hint(res),
            _ = &mut shutdown => Trigger::Shutdown,
        };

        // Wake whichever loop is still blocked on its channel.
        self.oracle_server.close();
        self.hint_reader.close();

        let result = match trigger {
            Trigger::Oracle(res) => {
                Self::join_remaining("hint router", hint_task).await;
                res
            }
            Trigger::Hint(res) => {
                Self::join_remaining("oracle server", oracle_task).await;
                res
            }
            Trigger::Shutdown => {
                info!(target: "preimage_server", "Shutdown requested, stopping preimage server.");
                Self::join_remaining("oracle server", oracle_task).await;
                Self::join_remaining("hint router", hint_task).await;
                Ok(Ok(()))
            }
        };

        result.map_err(|e| anyhow!(e))?
    }

    /// Awaits a loop that did not end the session. Its outcome is only logged.
    async fn join_remaining(name: &str, handle: JoinHandle<Result<()>>) {
        match handle.await {
            Ok(Ok(())) => debug!(target: "preimage_server", "The {name} stopped."),
            Ok(Err(e)) => debug!(target: "preimage_server", "The {name} stopped with: {e}"),
            Err(e) => error!(target: "preimage_server", "The {name} task failed: {e}"),
        }
    }

    /// Starts the oracle server, which waits for incoming preimage requests and serves them to the
    /// client.
    async fn start_oracle_server(oracle_server: Arc<P>, getter: Arc<G>) -> Result<()> {
        loop {
            match oracle_server.next_preimage_request(getter.as_ref()).await {
                Ok(()) => continue,
                Err(e) if e.is_closed() => {
                    info!(target: "preimage_server", "Preimage channel closed.");
                    return Ok(());
                }
                Err(e) => {
                    error!(target: "preimage_server", "Failed to serve preimage request: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    /// Starts the hint router, which waits for incoming hints and routes them to the
    /// [HintHandler].
    async fn start_hint_router(hint_reader: Arc<H>, hint_handler: Arc<R>) -> Result<()> {
        loop {
            match hint_reader.next_hint(hint_handler.as_ref()).await {
                Ok(()) => continue,
                Err(e) if e.is_closed() => {
                    info!(target: "preimage_server", "Hint channel closed.");
                    return Ok(());
                }
                Err(e) => {
                    error!(target: "preimage_server", "Failed to route hint: {e}");
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{KvPreimageGetter, MemoryKeyValueStore, SharedKeyValueStore};
    use alloy_primitives::{hex, keccak256, B256};
    use async_trait::async_trait;
    use pio_preimage::{
        errors::{PreimageOracleError, PreimageOracleResult},
        BidirectionalChannel, Hint, HintReader, HintWriter, HintWriterClient, NativeChannel,
        OracleReader, OracleServer, PreimageKey, PreimageOracleClient,
    };
    use std::{collections::HashMap, time::Duration};
    use tokio::{sync::RwLock, time::timeout};

    /// Inserts preimages it knows about when hinted with their `keccak256` digest.
    struct KnownPreimages {
        kv_store: SharedKeyValueStore,
        known: HashMap<B256, Vec<u8>>,
    }

    #[async_trait]
    impl HintHandler for KnownPreimages {
        async fn handle_hint(&self, hint: Hint) -> PreimageOracleResult<()> {
            if let Some(value) = self.known.get(&hint.hash) {
                self.kv_store
                    .write()
                    .await
                    .set(PreimageKey::keccak256(hint.hash).into(), value.clone())
                    .map_err(|e| PreimageOracleError::Other(e.to_string()))?;
            }
            Ok(())
        }
    }

    struct Session {
        server: PreimageServer<
            OracleServer<NativeChannel>,
            HintReader<NativeChannel>,
            KvPreimageGetter,
            KnownPreimages,
        >,
        oracle: OracleReader<NativeChannel>,
        hints: HintWriter<NativeChannel>,
        kv_store: SharedKeyValueStore,
    }

    fn session(known: &[&[u8]]) -> Session {
        let hint_chan = BidirectionalChannel::default();
        let preimage_chan = BidirectionalChannel::default();
        let kv_store: SharedKeyValueStore = Arc::new(RwLock::new(MemoryKeyValueStore::new()));
        let handler = KnownPreimages {
            kv_store: Arc::clone(&kv_store),
            known: known.iter().map(|v| (keccak256(v), v.to_vec())).collect(),
        };

        let server = PreimageServer::new(
            OracleServer::new(preimage_chan.host),
            HintReader::new(hint_chan.host).with_ack(true),
            Arc::new(KvPreimageGetter::new(Arc::clone(&kv_store))),
            Arc::new(handler),
        );

        Session {
            server,
            oracle: OracleReader::new(preimage_chan.client),
            hints: HintWriter::new(hint_chan.client).with_ack(true),
            kv_store,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hint_then_fetch() {
        let Session { server, oracle, hints, .. } = session(&[b"lazy"]);
        let server = tokio::task::spawn(server.start());

        let hash = keccak256(b"lazy");
        hints.write(&format!("fetch {}", hex::encode(hash))).await.unwrap();
        let value = oracle.get(PreimageKey::keccak256(hash)).await.unwrap();
        assert_eq!(value, b"lazy");

        drop((oracle, hints));
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_preimage_ends_session() {
        let Session { server, oracle, hints, .. } = session(&[]);
        let server = tokio::task::spawn(server.start());

        let res = oracle.get(PreimageKey::for_keccak256_preimage(b"never hinted")).await;
        assert!(res.is_err());

        let err = timeout(Duration::from_secs(5), server).await.unwrap().unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreimageOracleError>(),
            Some(PreimageOracleError::KeyNotFound)
        ));
        drop(hints);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closing_one_channel_ends_session() {
        let Session { server, oracle, hints, kv_store } = session(&[]);
        let server = tokio::task::spawn(server.start());

        // The hint channel stays open; closing the preimage channel alone must end the session.
        drop(oracle);
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap().unwrap();

        assert!(kv_store.read().await.is_empty());
        drop(hints);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_signal() {
        let Session { server, oracle, hints, .. } = session(&[]);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::task::spawn(server.start_with_shutdown(async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap().unwrap();
        drop((oracle, hints));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_malformed_hint_keeps_session_alive() {
        let Session { server, oracle, hints, kv_store } = session(&[b"lazy"]);
        let server = tokio::task::spawn(server.start());

        hints.write("fetch").await.unwrap();
        hints.write("fetch 0xnothex").await.unwrap();
        assert!(kv_store.read().await.is_empty());

        let hash = keccak256(b"lazy");
        hints.write(&format!("fetch {}", hex::encode(hash))).await.unwrap();
        assert_eq!(oracle.get(PreimageKey::keccak256(hash)).await.unwrap(), b"lazy");

        drop((oracle, hints));
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap().unwrap();
    }
}
