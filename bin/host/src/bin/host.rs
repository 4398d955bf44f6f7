//! Main entrypoint for the host binary.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub, rustdoc::all)]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use anyhow::Result;
use clap::Parser;
use pio_host::{init_tracing_subscriber, start_server, start_server_and_native_client, HostCli};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cfg = HostCli::parse();
    init_tracing_subscriber(cfg.v)?;

    if cfg.server {
        start_server(cfg).await?;
    } else {
        let exit_code = start_server_and_native_client(cfg).await?;
        if exit_code != 0 {
            std::process::exit(exit_code);
        }
    }

    info!("Exiting host program.");
    Ok(())
}
