//! sw_post_message tool implementation.
//!
//! Posts a control message to the worker and returns its reply, if any.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use swcache_client::{ControlReply, ServiceWorker};

use crate::error::json_result;

/// Parameters for the sw_post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPostMessageParams {
    /// Message type: SKIP_WAITING, CLEAR_CACHE or GET_CACHE_SIZE.
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional payload; ignored by the built-in commands.
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Output from the sw_post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPostMessageOutput {
    /// Whether the worker answered on the reply port.
    pub replied: bool,
    pub reply: Option<ControlReply>,
}

/// Implementation of the sw_post_message tool.
pub async fn post_message_impl(worker: &ServiceWorker, params: SwPostMessageParams) -> Result<CallToolResult, McpError> {
    let message = json!({ "type": params.kind, "payload": params.payload });
    let reply = worker.post_message(&message).await?;

    json_result(&SwPostMessageOutput { replied: reply.is_some(), reply })
}
