//! Contains the [FileDescriptor]s the host inherits in server mode, and [pipe_channel] to turn a
//! pair of them into a [Channel](pio_preimage::Channel).

use anyhow::{anyhow, Result};
use pio_preimage::IoChannel;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use tokio::net::unix::pipe;

/// A [Channel](pio_preimage::Channel) over a pair of inherited pipes.
pub type PipeChannel = IoChannel<pipe::Receiver, pipe::Sender>;

/// File descriptors inherited from the parent process in server mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDescriptor {
    /// Read-only. Used to read hints from the client.
    HintRead,
    /// Write-only. Used to acknowledge hints.
    HintWrite,
    /// Read-only. Used to read preimage requests.
    PreimageRead,
    /// Write-only. Used to answer preimage requests.
    PreimageWrite,
}

impl From<FileDescriptor> for RawFd {
    fn from(fd: FileDescriptor) -> Self {
        match fd {
            FileDescriptor::HintRead => 3,
            FileDescriptor::HintWrite => 4,
            FileDescriptor::PreimageRead => 5,
            FileDescriptor::PreimageWrite => 6,
        }
    }
}

/// Creates a [PipeChannel] from an inherited read pipe and write pipe.
///
/// Takes ownership of both descriptors, which are closed when the last clone of the channel is
/// dropped. Must be called at most once per descriptor, from within a tokio runtime.
pub fn pipe_channel(read: FileDescriptor, write: FileDescriptor) -> Result<PipeChannel> {
    // SAFETY: The descriptors are inherited from the parent process and are not owned by anything
    // else in this process.
    let (read_fd, write_fd) =
        unsafe { (OwnedFd::from_raw_fd(read.into()), OwnedFd::from_raw_fd(write.into())) };

    let receiver = pipe::Receiver::from_owned_fd(read_fd)
        .map_err(|e| anyhow!("Failed to open {read:?} as a pipe: {e}"))?;
    let sender = pipe::Sender::from_owned_fd(write_fd)
        .map_err(|e| anyhow!("Failed to open {write:?} as a pipe: {e}"))?;

    Ok(IoChannel::new(receiver, sender))
}
