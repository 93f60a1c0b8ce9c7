//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named cache stores with a SQLite backend
//! - Request/response snapshots
//! - Synthetic offline and error responses
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod responses;

pub use cache::{CacheDb, CacheStorage, StoreSummary};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{Request, RequestMode, Response};
