#![forbid(unsafe_code)]

mod config;
mod entry;
mod store;
mod sweep;

pub use config::{ExpiryMode, StoreConfig, ttl_from_millis};
pub use store::TtlStore;

pub use hotkv_common::{StoreError, StoreResult};
