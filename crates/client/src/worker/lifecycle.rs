//! Install and activation of a worker version.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::{join_all, try_join_all};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStorage, Error, Request, Response};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::config::WorkerConfig;
use crate::fetch::Network;

/// Where a worker version is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// Stale stores removed (or not) during activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Drives a worker version through install and activation.
///
/// Transitions are serialized; reads of the state never wait on a running
/// install.
pub struct Lifecycle {
    config: Arc<WorkerConfig>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    transition: Mutex<()>,
    skip_waiting: AtomicBool,
    controlling: AtomicBool,
}

impl Lifecycle {
    pub fn new(config: Arc<WorkerConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            transition: Mutex::new(()),
            skip_waiting: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether clients have been claimed.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        let previous = *state;
        tracing::info!(from = %previous, to = %next, "worker state changed");
        *state = next;
    }

    /// Precache every core asset. Returns the number of entries written.
    ///
    /// All-or-nothing: one failed asset fails the install, leaves the core
    /// store without entries and puts the worker back in `parsed`.
    pub async fn install(&self) -> Result<usize, Error> {
        let _transition = self.transition.lock().await;
        self.install_locked().await
    }

    async fn install_locked(&self) -> Result<usize, Error> {
        let current = self.state().await;
        if current != WorkerState::Parsed {
            return Err(Error::InvalidState(format!("cannot install a worker that is {current}")));
        }

        self.set_state(WorkerState::Installing).await;

        match self.precache().await {
            Ok(count) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Installed).await;
                tracing::info!(cache = %self.config.core_cache, assets = count, "install complete");
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(error = %err, "install failed");
                self.set_state(WorkerState::Parsed).await;
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        self.storage.open(&self.config.core_cache).await?;

        let entries = try_join_all(self.config.core_assets.iter().map(|url| self.fetch_asset(url))).await?;
        self.storage.put_all(&self.config.core_cache, &entries).await?;

        self.storage.open(&self.config.runtime_cache).await?;

        Ok(entries.len())
    }

    async fn fetch_asset(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let failure = |reason: String| Error::InstallAssetFailure { url: url.to_string(), reason };

        let response = self.network.fetch(&request).await.map_err(|e| failure(e.to_string()))?;
        if !response.is_ok() {
            return Err(failure(format!("status {}", response.status.as_u16())));
        }

        Ok((request, response))
    }

    /// Delete every stale store and claim clients.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let _transition = self.transition.lock().await;
        self.activate_locked().await
    }

    async fn activate_locked(&self) -> Result<ActivationReport, Error> {
        let current = self.state().await;
        if current != WorkerState::Installed {
            return Err(Error::InvalidState(format!("cannot activate a worker that is {current}")));
        }

        self.set_state(WorkerState::Activating).await;

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(err) => {
                self.set_state(WorkerState::Installed).await;
                return Err(err);
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| !self.config.is_current_cache(name)).collect();
        let results = join_all(stale.iter().map(|name| self.storage.delete(name))).await;

        let mut report = ActivationReport::default();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    tracing::info!(cache = %name, "deleted stale cache");
                    report.deleted.push(name);
                }
                Err(err) => {
                    let err = Error::StoreDeletionFailure { name: name.clone(), reason: err.to_string() };
                    tracing::warn!("{err}");
                    report.failed.push(name);
                }
            }
        }

        self.controlling.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Activated).await;

        Ok(report)
    }

    /// Record the skip-waiting signal and activate now if the worker waits.
    pub async fn skip_waiting(&self) -> Result<Option<ActivationReport>, Error> {
        let _transition = self.transition.lock().await;
        self.skip_waiting.store(true, Ordering::SeqCst);

        if self.state().await == WorkerState::Installed {
            return self.activate_locked().await.map(Some);
        }
        Ok(None)
    }

    /// Install, then activate if skip-waiting was signalled.
    ///
    /// Registering an activated worker is a no-op.
    pub async fn register(&self) -> Result<Option<ActivationReport>, Error> {
        let _transition = self.transition.lock().await;

        match self.state().await {
            WorkerState::Activated => return Ok(None),
            WorkerState::Parsed => {
                self.install_locked().await?;
            }
            WorkerState::Installed => {}
            other => return Err(Error::InvalidState(format!("cannot register a worker that is {other}"))),
        }

        if self.skip_waiting_requested() {
            return self.activate_locked().await.map(Some);
        }
        Ok(None)
    }

    /// [`register`](Self::register) with a fixed delay between failed attempts.
    pub async fn register_with_retry(
        &self, max_attempts: u32, delay: Duration,
    ) -> Result<Option<ActivationReport>, Error> {
        let mut attempt = 1;
        loop {
            match self.register().await {
                Ok(report) => return Ok(report),
                Err(err) if attempt >= max_attempts => return Err(err),
                Err(err) => {
                    tracing::warn!(attempt, max_attempts, error = %err, "registration failed, retrying in {}s", delay.as_secs());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
