//! Tracing utilities for the host binary.

use anyhow::{anyhow, Result};
use tracing::Level;

/// Initializes the tracing subscriber
///
/// # Arguments
/// * `verbosity_level` - The verbosity level (0-4)
///
/// # Returns
/// * `Result<()>` - Ok if successful, Err otherwise.
pub fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt().with_max_level(verbosity(verbosity_level)).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}

/// Maps a `-v` count to the most verbose [Level] that is emitted.
const fn verbosity(verbosity_level: u8) -> Level {
    match verbosity_level {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let levels = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];
        for (count, level) in levels.into_iter().enumerate() {
            assert_eq!(verbosity(count as u8), level);
        }
        assert_eq!(verbosity(u8::MAX), Level::TRACE);
    }
}
