//! sw_status tool implementation.
//!
//! Reports the lifecycle state and what each store holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ServiceWorker, WorkerState};
use swcache_core::StoreSummary;

use crate::error::json_result;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub state: WorkerState,
    /// Whether requests are served by the caching strategies.
    pub controlling: bool,
    pub core_cache: String,
    pub runtime_cache: String,
    /// Every store in creation order.
    pub caches: Vec<StoreSummary>,
    pub total_bytes: u64,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let caches = worker.storage().summaries().await?;
    let total_bytes = caches.iter().map(|c| c.bytes).sum();

    let output = SwStatusOutput {
        state: worker.state().await,
        controlling: worker.is_controlling(),
        core_cache: worker.config().core_cache.clone(),
        runtime_cache: worker.config().runtime_cache.clone(),
        caches,
        total_bytes,
    };

    json_result(&output)
}
