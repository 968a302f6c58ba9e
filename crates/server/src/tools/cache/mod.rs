//! Cache inspection and maintenance tools.
//!
//! These operate on the named stores behind the worker.

pub mod get;
pub mod stores;
pub mod sweep;

pub use get::{CacheGetParams, get_impl};
pub use stores::{CacheStoresParams, stores_impl};
pub use sweep::{CacheSweepParams, sweep_impl};
