//! The offline caching worker.
//!
//! [`ServiceWorker`] ties together the parts a host needs:
//!
//! - [`classify`]: which strategy serves a request
//! - [`strategy`]: the per-class caching strategies
//! - [`lifecycle`]: install and activation of a worker version
//! - [`control`]: maintenance messages
//!
//! Until the worker is activated it does not control requests, and
//! [`ServiceWorker::handle_fetch`] passes them straight to the network.

pub mod classify;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use swcache_core::{CacheStorage, Error, Request, Response};
use tokio::sync::oneshot;

pub use classify::{Classifier, RequestClass};
pub use config::WorkerConfig;
pub use control::{ControlChannel, ControlMessage, ControlReply};
pub use lifecycle::{ActivationReport, Lifecycle, WorkerState};
pub use strategy::Dispatcher;

use crate::fetch::Network;

/// Result of one intercepted request.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// `None` when the worker did not control the request.
    pub class: Option<RequestClass>,
    pub response: Response,
    pub elapsed: Duration,
    /// Dispatching took longer than the configured slow-request threshold.
    pub slow: bool,
}

/// A single worker version bound to its stores and network.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    dispatcher: Dispatcher,
    lifecycle: Arc<Lifecycle>,
    control: ControlChannel,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(Arc::clone(&config), Arc::clone(&storage), Arc::clone(&network));
        let lifecycle = Arc::new(Lifecycle::new(Arc::clone(&config), Arc::clone(&storage), Arc::clone(&network)));
        let control = ControlChannel::new(Arc::clone(&lifecycle), Arc::clone(&storage));

        Self { config, storage, network, dispatcher, lifecycle, control }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    pub fn is_controlling(&self) -> bool {
        self.lifecycle.is_controlling()
    }

    pub async fn install(&self) -> Result<usize, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.activate().await
    }

    pub async fn register(&self) -> Result<Option<ActivationReport>, Error> {
        self.lifecycle.register().await
    }

    pub async fn register_with_retry(
        &self, max_attempts: u32, delay: Duration,
    ) -> Result<Option<ActivationReport>, Error> {
        self.lifecycle.register_with_retry(max_attempts, delay).await
    }

    pub async fn skip_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        self.lifecycle.skip_waiting().await
    }

    /// Serve an intercepted request.
    ///
    /// Controlled requests always produce a response, and are flagged `slow`
    /// past the threshold without the response changing. Uncontrolled
    /// requests go to the network and fail with its error.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let start = Instant::now();

        if !self.is_controlling() {
            let response = self.network.fetch(request).await?;
            return Ok(FetchOutcome { class: None, response, elapsed: start.elapsed(), slow: false });
        }

        let (class, response) = self.dispatcher.handle(request).await;
        let elapsed = start.elapsed();
        let slow = elapsed > self.config.slow_request;

        if slow {
            tracing::warn!(url = %request.url, ?class, elapsed_ms = elapsed.as_millis() as u64, "slow request");
        } else {
            tracing::debug!(url = %request.url, ?class, status = response.status.as_u16(), "served request");
        }

        Ok(FetchOutcome { class: Some(class), response, elapsed, slow })
    }

    /// Post a JSON control message and wait for its reply, if it has one.
    pub async fn post_message(&self, message: &Value) -> Result<Option<ControlReply>, Error> {
        let message = ControlMessage::parse(message)?;

        if !message.expects_reply() {
            self.control.handle(message, None).await;
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        self.control.handle(message, Some(tx)).await;
        Ok(rx.await.ok())
    }
}
