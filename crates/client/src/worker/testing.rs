//! Test doubles for the worker's network and storage seams.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use http::header::{self, HeaderMap, HeaderValue};
use swcache_core::{AppConfig, CacheDb, CacheStorage, Error, Request, Response, StoreSummary};
use tokio::sync::Notify;

use super::config::WorkerConfig;
use crate::fetch::Network;

pub(crate) const ORIGIN: &str = "https://example.com";

/// Worker config for `https://example.com` with the default asset list.
pub(crate) fn test_config() -> WorkerConfig {
    let app = AppConfig { origin: ORIGIN.into(), ..Default::default() };
    WorkerConfig::from_app(&app).unwrap()
}

pub(crate) fn text_response(body: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Response::new(StatusCode::OK, headers, body.to_string())
}

/// Route every core asset of `config` to a small text body.
pub(crate) fn serve_site(network: &MockNetwork, config: &WorkerConfig) {
    for asset in &config.core_assets {
        network.route_text(asset.as_str(), &format!("asset {}", asset.path()));
    }
}

/// Scripted network: routes by URL, records every call.
#[derive(Default)]
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    hanging: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    failures: AtomicUsize,
    fetched: Notify,
}

impl MockNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn route_text(&self, url: &str, body: &str) {
        self.route(url, text_response(body));
    }

    /// Calls for `url` never resolve.
    pub(crate) fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    /// Calls for `url` resolve after `delay`.
    pub(crate) fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The next `count` calls fail as if offline.
    pub(crate) fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }

    /// Wait until some fetch has started, or panic after a second.
    pub(crate) async fn wait_for_fetch(&self) {
        tokio::time::timeout(Duration::from_secs(1), self.fetched.notified())
            .await
            .expect("no fetch was started");
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        self.fetched.notify_one();

        let failing = self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if failing || self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("{url}: offline")));
        }

        let hangs = self.hanging.lock().unwrap().contains(&url);
        if hangs {
            std::future::pending::<()>().await;
        }

        let delay = self.delays.lock().unwrap().get(&url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let routed = self.routes.lock().unwrap().get(&url).cloned();
        Ok(routed.unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), "Not Found")))
    }
}

/// SQLite storage whose `delete` fails for selected store names, and whose
/// lookups or writes can be switched to fail outright.
pub(crate) struct FlakyStorage {
    inner: CacheDb,
    undeletable: HashSet<String>,
    broken_reads: bool,
    broken_writes: bool,
}

impl FlakyStorage {
    pub(crate) fn new(inner: CacheDb, undeletable: &[&str]) -> Self {
        Self {
            inner,
            undeletable: undeletable.iter().map(|s| s.to_string()).collect(),
            broken_reads: false,
            broken_writes: false,
        }
    }

    /// `match_in` and `match_any` fail.
    pub(crate) fn with_broken_reads(mut self) -> Self {
        self.broken_reads = true;
        self
    }

    /// `put` and `put_all` fail.
    pub(crate) fn with_broken_writes(mut self) -> Self {
        self.broken_writes = true;
        self
    }
}

fn fail_if(broken: bool) -> Result<(), Error> {
    if broken {
        return Err(Error::CorruptEntry("disk image is malformed".into()));
    }
    Ok(())
}

#[async_trait]
impl CacheStorage for FlakyStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.undeletable.contains(name) {
            return Err(Error::InvalidState(format!("{name} is locked")));
        }
        self.inner.delete(name).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        fail_if(self.broken_writes)?;
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        fail_if(self.broken_writes)?;
        self.inner.put_all(name, entries).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        fail_if(self.broken_reads)?;
        self.inner.match_in(name, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        fail_if(self.broken_reads)?;
        self.inner.match_any(request).await
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        self.inner.entry_count(name).await
    }

    async fn total_size(&self) -> Result<u64, Error> {
        self.inner.total_size().await
    }

    async fn summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.inner.summaries().await
    }
}
