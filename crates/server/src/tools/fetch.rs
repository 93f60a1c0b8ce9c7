//! sw_fetch tool implementation.
//!
//! Runs one request through the worker as if a page had issued it.

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::{RequestClass, ServiceWorker};
use swcache_core::{Request, RequestMode};
use url::Url;

use crate::error::{ToolError, json_result};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: RequestMode,

    /// Extra request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Request body sent with the method, e.g. a form submission.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// How [`SwFetchOutput::body`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BodyEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    /// Strategy class; absent when the worker did not control the request.
    pub class: Option<RequestClass>,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Body as text, or base64 for binary content.
    pub body: String,
    pub body_encoding: BodyEncoding,
    pub body_bytes: usize,
    pub controlled: bool,
    pub elapsed_ms: u64,
    /// Took longer than the slow-request threshold.
    pub slow: bool,
    /// ISO8601 timestamp of when the response was served.
    pub served_at: String,
}

fn build_request(origin: &Url, params: &SwFetchParams) -> Result<Request, ToolError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()));
    }

    let url = resolve(origin, &params.url).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    let method = Method::from_bytes(params.method.to_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("unsupported method: {}", params.method)))?;

    let mut request = Request::new(method, url, params.mode);
    request.headers = build_headers(params.headers.as_ref())?;
    if let Some(body) = &params.body {
        request.body = body.clone().into();
    }
    Ok(request)
}

fn build_headers(headers: Option<&BTreeMap<String, String>>) -> Result<HeaderMap, ToolError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers.into_iter().flatten() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ToolError::InvalidInput(format!("invalid value for header {name}")))?;
        map.append(name, value);
    }
    Ok(map)
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.starts_with("text/")
        || ["json", "xml", "javascript", "svg", "x-www-form-urlencoded"]
            .iter()
            .any(|marker| essence.contains(marker))
}

/// Text when the content type is textual (or absent) and the bytes are
/// UTF-8; base64 otherwise.
fn encode_body(content_type: Option<&str>, body: &[u8]) -> (String, BodyEncoding) {
    match std::str::from_utf8(body) {
        Ok(text) if content_type.is_none_or(is_textual) => (text.to_string(), BodyEncoding::Utf8),
        _ => (STANDARD.encode(body), BodyEncoding::Base64),
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(&worker.config().origin, &params)?;

    let outcome = worker.handle_fetch(&request).await.map_err(|err| {
        tracing::debug!(url = %request.url, "uncontrolled fetch failed: {err}");
        McpError::from(err)
    })?;

    let response = outcome.response;
    let (body, body_encoding) = encode_body(response.content_type(), &response.body);
    let output = SwFetchOutput {
        url: request.url.to_string(),
        class: outcome.class,
        status: response.status.as_u16(),
        status_text: response.status_text.clone(),
        headers: flatten_headers(&response.headers),
        body,
        body_encoding,
        body_bytes: response.body_len(),
        controlled: outcome.class.is_some(),
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        slow: outcome.slow,
        served_at: Utc::now().to_rfc3339(),
    };

    json_result(&output)
}
