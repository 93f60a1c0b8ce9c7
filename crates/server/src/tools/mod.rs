//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod fetch;
pub mod message;
pub mod status;

pub use fetch::{SwFetchParams, fetch_impl};
pub use message::{SwPostMessageParams, post_message_impl};
pub use status::status_impl;
