//! SQLite-backed named response stores.
//!
//! This module provides the durable key-value layer under the strategy
//! engine, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions created lazily on open
//! - Exact-match lookup by request identity (SHA-256 of method and URL)
//! - Insertion-ordered key listing for eviction
//! - Automatic schema migrations and WAL mode

pub mod backend;
pub mod connection;
pub mod entry;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use backend::{CacheBackend, Caches, Store};
pub use connection::CacheDb;
pub use entry::{CacheEntry, Headers, RequestKey};
