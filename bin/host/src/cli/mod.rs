//! This module contains all CLI-specific code for the host binary.

use crate::session::MulAddSession;
use clap::{
    builder::styling::{AnsiColor, Color, Style},
    ArgAction, Parser,
};
use pio_preimage::MAX_HINT_SIZE;
use pio_preimage_server::{MemoryKeyValueStore, SharedKeyValueStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

mod tracing_util;
pub use tracing_util::init_tracing_subscriber;

const ABOUT: &str = "
pio-host is a CLI application that runs a preimage oracle server for a multiply-add session. The
host can run in two modes: server mode and native mode. In server mode, the host serves a client
program in the parent process over inherited pipes. In native mode, the host runs a built-in
client in the same process and checks the session's claim.
";

/// The host binary CLI application arguments.
#[derive(Parser, Serialize, Clone, Debug)]
#[command(about = ABOUT, version, styles = cli_styles())]
pub struct HostCli {
    /// Verbosity level (0-4)
    #[arg(long, short, help = "Verbosity level (0-4)", action = ArgAction::Count)]
    pub v: u8,
    /// Run in preimage server mode, serving a client over file descriptors 3 through 6.
    #[clap(long, conflicts_with = "native", required_unless_present = "native")]
    pub server: bool,
    /// Run the built-in client in the host process and check the session's claim.
    #[clap(long, conflicts_with = "server", required_unless_present = "server")]
    pub native: bool,
    /// Write a one-byte acknowledgement after every hint in server mode. The client must expect
    /// it. Native mode always acknowledges hints.
    #[clap(long)]
    pub hint_ack: bool,
    /// The starting state of the session.
    #[clap(long, env = "PIO_STATE", default_value_t = MulAddSession::DEFAULT.state)]
    pub state: u64,
    /// The multiplier applied to the state.
    #[clap(long, env = "PIO_MUL", default_value_t = MulAddSession::DEFAULT.mul)]
    pub mul: u64,
    /// The addend applied after multiplying.
    #[clap(long, env = "PIO_ADD", default_value_t = MulAddSession::DEFAULT.add)]
    pub add: u64,
    /// Upper bound on the bytes held by the preimage store. Unbounded if not provided.
    #[clap(long, env = "PIO_MAX_STORE_BYTES")]
    pub max_store_bytes: Option<usize>,
    /// Upper bound on the length of a single hint, in bytes.
    #[clap(long, env = "PIO_MAX_HINT_SIZE", default_value_t = MAX_HINT_SIZE)]
    pub max_hint_size: usize,
}

impl HostCli {
    /// Returns the [MulAddSession] described by the CLI arguments.
    pub const fn session(&self) -> MulAddSession {
        MulAddSession::new(self.state, self.mul, self.add)
    }

    /// Parses the CLI arguments and returns a new, empty instance of a [SharedKeyValueStore], as
    /// it is configured to be created.
    pub fn construct_kv_store(&self) -> SharedKeyValueStore {
        let kv_store = self
            .max_store_bytes
            .map_or_else(MemoryKeyValueStore::new, MemoryKeyValueStore::with_capacity_limit);
        Arc::new(RwLock::new(kv_store))
    }
}

/// Styles for the CLI application.
pub const fn cli_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

#[cfg(test)]
mod test {
    use crate::HostCli;
    use clap::Parser;
    use pio_preimage::MAX_HINT_SIZE;

    #[test]
    fn test_exclusive_flags() {
        let cases = [
            // valid
            (["--server"].as_slice(), true),
            (["--native"].as_slice(), true),
            (["--server", "--hint-ack"].as_slice(), true),
            (["--native", "-vvv", "--state", "7"].as_slice(), true),
            // invalid
            (["--server", "--native"].as_slice(), false),
            (["--hint-ack"].as_slice(), false),
            (["--native", "--state", "-1"].as_slice(), false),
            ([].as_slice(), false),
        ];

        for (args_ext, valid) in cases.into_iter() {
            let args = ["host"].iter().chain(args_ext.iter()).cloned().collect::<Vec<_>>();

            let parsed = HostCli::try_parse_from(args);
            assert_eq!(parsed.is_ok(), valid, "args: {args_ext:?}");
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = HostCli::try_parse_from(["host", "--native"]).unwrap();

        assert_eq!((cfg.state, cfg.mul, cfg.add), (1000, 3, 4));
        assert_eq!(cfg.max_hint_size, MAX_HINT_SIZE);
        assert_eq!(cfg.max_store_bytes, None);
        assert!(!cfg.hint_ack);
        assert_eq!(cfg.v, 0);
    }

    #[tokio::test]
    async fn test_construct_kv_store() {
        let cfg =
            HostCli::try_parse_from(["host", "--server", "--max-store-bytes", "64"]).unwrap();
        let kv_store = cfg.construct_kv_store();
        let mut kv_store = kv_store.write().await;

        assert!(kv_store.is_empty());
        cfg.session().bootstrap(&mut *kv_store).unwrap_err();
    }
}
