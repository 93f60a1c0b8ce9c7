//! Per-class caching strategies.
//!
//! [`Dispatcher::handle`] never fails: network failures and cache misses fall
//! through each strategy's fallback chain until a response is produced, with
//! the offline page or a 503 as the last resort.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use http::header::{HeaderName, HeaderValue};
use swcache_core::responses::{CACHE_DATE_HEADER, offline_page, service_unavailable};
use swcache_core::{CacheStorage, Error, Request, Response};

use super::classify::{Classifier, RequestClass};
use super::config::WorkerConfig;
use crate::fetch::Network;

/// Where a cache lookup searches.
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    In(&'a str),
    Any,
}

/// Whether a stamped response is younger than `window` at `now`.
///
/// A missing or unparseable capture date counts as the Unix epoch.
pub fn is_fresh(response: &Response, now: DateTime<Utc>, window: Duration) -> bool {
    let captured = response
        .header(CACHE_DATE_HEADER)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);

    now.signed_duration_since(captured) < window
}

/// Copy of `response` carrying the capture date header.
pub fn stamp(response: &Response, now: DateTime<Utc>) -> Option<Response> {
    let value = HeaderValue::from_str(&now.to_rfc3339()).ok()?;
    Some(response.with_header(HeaderName::from_static(CACHE_DATE_HEADER), value))
}

/// Runs the strategy matching each request's class against the stores and
/// the network.
pub struct Dispatcher {
    config: Arc<WorkerConfig>,
    classifier: Classifier,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl Dispatcher {
    pub fn new(config: Arc<WorkerConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let classifier = Classifier::from_config(&config);
        Self { config, classifier, storage, network }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify and serve one intercepted request.
    pub async fn handle(&self, request: &Request) -> (RequestClass, Response) {
        let class = self.classifier.classify(request);
        let response = match class {
            RequestClass::Navigation => self.navigation(request).await,
            _ if !request.is_read() => self.network_only(request).await,
            RequestClass::SameOrigin => self.same_origin(request).await,
            RequestClass::ExternalAllowed => self.external(request).await,
            RequestClass::Other => self.other(request).await,
        };
        (class, response)
    }

    /// Network first; then the exact request, the fallback document and the
    /// offline page. Form submissions skip the exact-request lookup.
    async fn navigation(&self, request: &Request) -> Response {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(&self.config.runtime_cache, request, &response).await;
                }
                response
            }
            Err(err) => {
                tracing::info!(
                    url = %request.url, method = %request.method, error = %err,
                    "navigation failed, serving from cache"
                );

                let exact = if request.is_read() { self.cached(Lookup::Any, request).await } else { None };
                if let Some(cached) = exact {
                    return cached;
                }

                let fallback = Request::get(self.config.fallback_document.clone());
                if let Some(cached) = self.cached(Lookup::Any, &fallback).await {
                    return cached;
                }

                offline_page(&self.config.site_name)
            }
        }
    }

    /// Core store first with a background refresh; network on a miss.
    async fn same_origin(&self, request: &Request) -> Response {
        if let Some(cached) = self.cached(Lookup::In(&self.config.core_cache), request).await {
            self.refresh_in_background(request);
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(&self.config.core_cache, request, &response).await;
                }
                response
            }
            Err(err) => {
                tracing::info!(url = %request.url, error = %err, "asset fetch failed");
                self.cached(Lookup::Any, request).await.unwrap_or_else(service_unavailable)
            }
        }
    }

    /// Runtime store while fresh; otherwise network, stamping what is stored.
    async fn external(&self, request: &Request) -> Response {
        let runtime = self.config.runtime_cache.as_str();

        if let Some(cached) = self.cached(Lookup::In(runtime), request).await {
            if is_fresh(&cached, Utc::now(), self.config.freshness) {
                return cached;
            }
            tracing::debug!(url = %request.url, "cached external resource expired");
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    match stamp(&response, Utc::now()) {
                        Some(stamped) => self.store(runtime, request, &stamped).await,
                        None => tracing::warn!(url = %request.url, "could not stamp capture date"),
                    }
                }
                response
            }
            Err(err) => {
                tracing::info!(url = %request.url, error = %err, "external resource failed");
                self.cached(Lookup::In(runtime), request).await.unwrap_or_else(service_unavailable)
            }
        }
    }

    /// Network first; successful responses are cached and used as fallback.
    async fn other(&self, request: &Request) -> Response {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(&self.config.runtime_cache, request, &response).await;
                }
                response
            }
            Err(err) => {
                tracing::info!(url = %request.url, error = %err, "request failed");
                self.cached(Lookup::Any, request).await.unwrap_or_else(service_unavailable)
            }
        }
    }

    /// Non-GET sub-resource requests: never looked up, never stored.
    async fn network_only(&self, request: &Request) -> Response {
        self.network.fetch(request).await.unwrap_or_else(|err| {
            tracing::info!(url = %request.url, method = %request.method, error = %err, "request failed");
            service_unavailable()
        })
    }

    /// Refetch a same-origin asset and overwrite its core entry.
    ///
    /// Detached: nothing awaits or cancels the task, and its failure is only
    /// logged so it can never affect the response already returned.
    fn refresh_in_background(&self, request: &Request) {
        let storage = Arc::clone(&self.storage);
        let network = Arc::clone(&self.network);
        let cache = self.config.core_cache.clone();
        let request = request.clone();

        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    if let Err(err) = storage.put(&cache, &request, &response).await {
                        tracing::debug!(url = %request.url, error = %err, "background refresh not stored");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status.as_u16(), "background refresh skipped");
                }
                Err(err) => {
                    tracing::debug!(url = %request.url, error = %err, "background refresh failed");
                }
            }
        });
    }

    /// Cache lookup; storage errors degrade to a miss.
    async fn cached(&self, lookup: Lookup<'_>, request: &Request) -> Option<Response> {
        match self.lookup(lookup, request).await {
            Ok(response) => Some(response),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(url = %request.url, "{err}");
                None
            }
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "cache lookup failed");
                None
            }
        }
    }

    async fn lookup(&self, lookup: Lookup<'_>, request: &Request) -> Result<Response, Error> {
        let found = match lookup {
            Lookup::In(name) => self.storage.match_in(name, request).await?,
            Lookup::Any => self.storage.match_any(request).await?,
        };
        found.ok_or_else(|| Error::CacheMiss(request.url.to_string()))
    }

    async fn store(&self, cache: &str, request: &Request, response: &Response) {
        if !request.is_read() {
            return;
        }
        if let Err(err) = self.storage.put(cache, request, response).await {
            tracing::warn!(url = %request.url, cache, error = %err, "failed to cache response");
        }
    }
}
