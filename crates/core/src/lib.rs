//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named response stores with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheBackend, CacheDb, CacheEntry, Caches, Headers, RequestKey, Store};
pub use config::{AppConfig, ConfigError, StoreNames};
pub use error::{Error, StoreErrorKind};
