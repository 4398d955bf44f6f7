//! Test utilities for the `pio-preimage` crate.

use crate::{BidirectionalChannel, NativeChannel};

/// Creates a connected `(client, host)` pair of [NativeChannel]s.
pub(crate) fn native_channel_pair() -> (NativeChannel, NativeChannel) {
    let BidirectionalChannel { client, host } = BidirectionalChannel::default();
    (client, host)
}
