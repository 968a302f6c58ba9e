//! Client side of swcache.
//!
//! This crate provides the request classifier, the network fetcher, the
//! per-class caching strategies, the eviction sweeper and the
//! install/activate lifecycle, composed by [`CacheWorker`].

pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod strategy;
pub mod sweeper;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{Classifier, TrafficClass};
pub use fetch::{FetchClient, FetchConfig, Fetcher, NetworkResponse, UrlError, resolve};
pub use lifecycle::{ActivateReport, Lifecycle, Phase};
pub use strategy::{Served, Source, Strategy, StrategyEngine};
pub use sweeper::EvictionSweeper;
pub use worker::CacheWorker;
