//! Request and response snapshots exchanged between the worker, the network
//! and the cache stores.

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// Why the page issued a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    /// Payload forwarded to the network; empty for reads.
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// A plain `GET` sub-resource request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    /// A top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Safe read methods are the only ones whose responses may be cached.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    /// Opaque key addressing this request in a cache store.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}

/// Immutable capture of a response: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Build a response using the canonical reason phrase as status text.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        Self { status, status_text, headers, body: body.into() }
    }

    /// Status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Copy of this response with one header replaced.
    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut copy = self.clone();
        copy.headers.insert(name, value);
        copy
    }
}

/// Persisted header value. Values that are not UTF-8 (obs-text) are kept as
/// hex so they come back byte for byte.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Raw { hex: String },
}

impl From<&HeaderValue> for StoredValue {
    fn from(value: &HeaderValue) -> Self {
        match std::str::from_utf8(value.as_bytes()) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Raw { hex: hex::encode(value.as_bytes()) },
        }
    }
}

impl TryFrom<StoredValue> for HeaderValue {
    type Error = Error;

    fn try_from(value: StoredValue) -> Result<Self, Error> {
        let bytes = match value {
            StoredValue::Text(text) => text.into_bytes(),
            StoredValue::Raw { hex } => hex::decode(hex).map_err(|e| Error::CorruptEntry(e.to_string()))?,
        };
        HeaderValue::from_bytes(&bytes).map_err(|e| Error::CorruptEntry(e.to_string()))
    }
}

/// Serialize headers as an ordered list of name/value pairs.
pub fn headers_to_json(headers: &HeaderMap) -> Result<String, Error> {
    let pairs: Vec<(&str, StoredValue)> =
        headers.iter().map(|(name, value)| (name.as_str(), StoredValue::from(value))).collect();
    serde_json::to_string(&pairs).map_err(|e| Error::CorruptEntry(format!("failed to encode headers: {e}")))
}

/// Inverse of [`headers_to_json`].
pub fn headers_from_json(json: &str) -> Result<HeaderMap, Error> {
    let pairs: Vec<(String, StoredValue)> =
        serde_json::from_str(json).map_err(|e| Error::CorruptEntry(format!("failed to decode headers: {e}")))?;

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        headers.append(name, HeaderValue::try_from(value)?);
    }
    Ok(headers)
}
