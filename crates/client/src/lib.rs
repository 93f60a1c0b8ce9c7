//! Network access and the offline caching worker.
//!
//! This crate provides the fetch client, request classification, the caching
//! strategies and the worker lifecycle used by the server.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};

pub use worker::{
    ActivationReport, ControlMessage, ControlReply, FetchOutcome, RequestClass, ServiceWorker, WorkerConfig,
    WorkerState,
};
