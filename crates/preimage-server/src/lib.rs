#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod errors;
pub use errors::KeyValueError;

mod kv;
pub use kv::{KeyValueStore, MemoryKeyValueStore, SharedKeyValueStore};

mod preimage;
pub use preimage::KvPreimageGetter;

mod server;
pub use server::PreimageServer;
