#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod cli;
pub use cli::{init_tracing_subscriber, HostCli};

pub mod client;
pub mod fd;
pub mod handler;
pub mod session;

use anyhow::Result;
use fd::{pipe_channel, FileDescriptor};
use handler::MulAddHintHandler;
use pio_preimage::{
    BidirectionalChannel, Channel, HintReader, HintWriter, OracleReader, OracleServer,
};
use pio_preimage_server::{KvPreimageGetter, PreimageServer, SharedKeyValueStore};
use std::sync::Arc;
use tokio::task;
use tracing::{error, info};

/// Starts the [PreimageServer] in the primary thread. In this mode, the host program has been
/// invoked by the parent process, which runs the client program and holds the other ends of the
/// pipes.
pub async fn start_server(cfg: HostCli) -> Result<()> {
    let (preimage_chan, hint_chan) = (
        pipe_channel(FileDescriptor::PreimageRead, FileDescriptor::PreimageWrite)?,
        pipe_channel(FileDescriptor::HintRead, FileDescriptor::HintWrite)?,
    );
    let kv_store = bootstrap_kv_store(&cfg).await?;

    // Start the server and wait for it to complete.
    info!("Starting preimage server.");
    preimage_server(&cfg, kv_store, preimage_chan, hint_chan, cfg.hint_ack)
        .start_with_shutdown(shutdown_signal())
        .await?;
    info!("Preimage server has exited.");

    Ok(())
}

/// Starts the [PreimageServer] and the client program in separate tasks. The client program is
/// ran natively in this mode.
///
/// ## Takes
/// - `cfg`: The host configuration.
///
/// ## Returns
/// - `Ok(exit_code)` if the server exited cleanly. The exit code is `1` if the client failed.
/// - `Err(_)` if the server failed or either task panicked.
pub async fn start_server_and_native_client(cfg: HostCli) -> Result<i32> {
    let hint_chan = BidirectionalChannel::default();
    let preimage_chan = BidirectionalChannel::default();
    let kv_store = bootstrap_kv_store(&cfg).await?;

    // The client relies on each hint being handled before its next request, so hints are always
    // acknowledged in native mode.
    let server_task = task::spawn(
        preimage_server(&cfg, kv_store, preimage_chan.host, hint_chan.host, true)
            .start_with_shutdown(shutdown_signal()),
    );
    let program_task = task::spawn(client::run(
        OracleReader::new(preimage_chan.client),
        HintWriter::new(hint_chan.client).with_ack(true),
    ));

    // Execute both tasks and wait for them to complete.
    info!("Starting preimage server and client program.");
    let (server_result, client_result) = tokio::try_join!(server_task, program_task)?;
    info!("Preimage server and client program have joined.");

    server_result?;
    if let Err(e) = &client_result {
        error!(target: "native_client", "Client program failed: {e}");
    }

    Ok(client_result.is_err() as i32)
}

/// Creates the key-value store for the session described by `cfg` and writes the session's local
/// keys into it.
pub async fn bootstrap_kv_store(cfg: &HostCli) -> Result<SharedKeyValueStore> {
    let kv_store = cfg.construct_kv_store();
    cfg.session().bootstrap(&mut *kv_store.write().await)?;
    Ok(kv_store)
}

/// Wires the channels, the store and the session's hint handler into a [PreimageServer].
fn preimage_server<C>(
    cfg: &HostCli,
    kv_store: SharedKeyValueStore,
    preimage_chan: C,
    hint_chan: C,
    hint_ack: bool,
) -> PreimageServer<OracleServer<C>, HintReader<C>, KvPreimageGetter, MulAddHintHandler>
where
    C: Channel + Send + Sync + 'static,
{
    PreimageServer::new(
        OracleServer::new(preimage_chan),
        HintReader::new(hint_chan).with_ack(hint_ack).with_max_hint_size(cfg.max_hint_size),
        Arc::new(KvPreimageGetter::new(Arc::clone(&kv_store))),
        Arc::new(MulAddHintHandler::new(kv_store, cfg.session())),
    )
}

/// Resolves on `SIGINT`. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the interrupt signal: {e}");
        std::future::pending::<()>().await;
    }
}
