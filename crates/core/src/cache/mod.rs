//! Named request → response stores.
//!
//! The worker only decides which store is used when; the stores themselves
//! live behind [`CacheStorage`]. [`CacheDb`] is the persistent implementation:
//!
//! - SQLite with WAL mode via tokio-rusqlite
//! - Automatic schema migrations
//! - Stores addressed by name, entries by an opaque request key
//! - Whole-store deletion only; entries are overwritten, never removed singly

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod stores;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::Error;
use crate::model::{Request, Response};

pub use connection::CacheDb;

/// Entry count and body bytes of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

/// Named cache stores shared by every in-flight request.
///
/// Implementations must tolerate concurrent reads and writes; for a given
/// key the last writer wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Store names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a whole store. Returns false when no store had that name.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Insert or overwrite one entry, creating the store on first write.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Write every entry or none of them.
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    /// Look the request up in one store.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look the request up in every store, oldest store first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    async fn entry_count(&self, name: &str) -> Result<u64, Error>;

    /// Sum of the body sizes of every entry in every store.
    async fn total_size(&self) -> Result<u64, Error>;

    /// Per-store entry counts and sizes, in creation order.
    async fn summaries(&self) -> Result<Vec<StoreSummary>, Error>;
}
