//! Errors for the `pio-preimage` crate.

use thiserror::Error;

/// A [PreimageOracleError] is an enum that differentiates channel-related errors from other errors
/// in the [PreimageOracleServer] and [HintReaderServer] implementations.
///
/// [PreimageOracleServer]: crate::PreimageOracleServer
/// [HintReaderServer]: crate::HintReaderServer
#[derive(Error, Debug)]
pub enum PreimageOracleError {
    /// The channel has been broken.
    #[error(transparent)]
    IOError(#[from] ChannelError),
    /// The preimage key is invalid.
    #[error("Invalid preimage key.")]
    InvalidPreimageKey,
    /// Key not found.
    #[error("Key not found.")]
    KeyNotFound,
    /// Buffer length mismatch.
    #[error("Buffer length mismatch. Expected {0}, got {1}.")]
    BufferLengthMismatch(usize, usize),
    /// The declared hint length exceeds the reader's limit.
    #[error("Hint of {0} bytes exceeds the maximum hint size of {1} bytes.")]
    HintTooLarge(u64, usize),
    /// Other errors.
    #[error("Error in preimage server: {0}")]
    Other(String),
}

impl PreimageOracleError {
    /// Returns `true` if the error signals that the channel was closed while idle, which ends a
    /// server loop cleanly.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::IOError(ChannelError::Closed))
    }
}

/// A [Result] type for the [PreimageOracleError] enum.
pub type PreimageOracleResult<T> = Result<T, PreimageOracleError>;

/// A [ChannelError] is an enum that describes the error cases of a [Channel] trait implementation.
///
/// [Channel]: crate::Channel
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel is closed, either locally or by the counterparty before any byte of the
    /// pending read arrived.
    #[error("Channel is closed.")]
    Closed,
    /// Unexpected EOF.
    #[error("Unexpected EOF in channel read operation.")]
    UnexpectedEOF,
    /// The underlying stream failed.
    #[error("Channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [Result] type for the [ChannelError] enum.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Reasons a hint string fails to decode into a [Hint].
///
/// [Hint]: crate::Hint
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintParseError {
    /// The hint did not split into exactly two space-separated tokens.
    #[error("expected 2 space-separated tokens, got {0}")]
    TokenCount(usize),
    /// The hash token is not valid hex.
    #[error("hash token is not valid hex")]
    InvalidHex,
    /// The hash token does not encode exactly 32 bytes.
    #[error("hash token has {0} hex characters, expected 64")]
    InvalidLength(usize),
}
