#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod errors;

mod key;
pub use key::{PreimageKey, PreimageKeyType};

mod oracle;
pub use oracle::{OracleReader, OracleServer};

mod hint;
pub use hint::{Hint, HintReader, HintWriter, MAX_HINT_SIZE};

mod traits;
pub use traits::{
    Channel, HintHandler, HintReaderServer, HintWriterClient, PreimageGetter,
    PreimageOracleClient, PreimageOracleServer,
};

mod channel;
pub use channel::{BidirectionalChannel, IoChannel, NativeChannel};

#[cfg(test)]
mod test_utils;
