//! Maintenance commands posted to the worker.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_core::{CacheStorage, Error};
use tokio::sync::oneshot;

use super::lifecycle::Lifecycle;

/// A control message, decoded from its `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting worker now.
    SkipWaiting,
    /// Delete every store.
    ClearCache,
    /// Report the byte size of every stored body.
    GetCacheSize,
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

impl ControlMessage {
    /// Decode a `{ "type": ..., "payload": ... }` envelope. The payload is
    /// accepted but unused by every known command.
    pub fn parse(value: &Value) -> Result<Self, Error> {
        let envelope = Envelope::deserialize(value)
            .map_err(|e| Error::InvalidInput(format!("malformed control message: {e}")))?;
        Ok(Self::from_type(&envelope.kind))
    }

    pub fn from_type(kind: &str) -> Self {
        match kind {
            "SKIP_WAITING" => Self::SkipWaiting,
            "CLEAR_CACHE" => Self::ClearCache,
            "GET_CACHE_SIZE" => Self::GetCacheSize,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether the sender should wait for a reply.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::ClearCache | Self::GetCacheSize)
    }
}

/// Reply sent on a message's reply port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ControlReply {
    Success { success: bool },
    Size { size: u64 },
    Error { error: String },
}

/// Handles control messages; holds no state of its own.
pub struct ControlChannel {
    lifecycle: Arc<Lifecycle>,
    storage: Arc<dyn CacheStorage>,
}

impl ControlChannel {
    pub fn new(lifecycle: Arc<Lifecycle>, storage: Arc<dyn CacheStorage>) -> Self {
        Self { lifecycle, storage }
    }

    /// Run `message`, replying at most once on `reply` after the work is done.
    pub async fn handle(&self, message: ControlMessage, reply: Option<oneshot::Sender<ControlReply>>) {
        match message {
            ControlMessage::SkipWaiting => {
                if let Err(err) = self.lifecycle.skip_waiting().await {
                    tracing::warn!(error = %err, "skip waiting failed");
                }
            }
            ControlMessage::ClearCache => {
                let outcome = match self.clear_all().await {
                    Ok(count) => {
                        tracing::info!(caches = count, "cleared all caches");
                        ControlReply::Success { success: true }
                    }
                    Err(err) => ControlReply::Error { error: err.to_string() },
                };
                respond(reply, outcome);
            }
            ControlMessage::GetCacheSize => {
                let outcome = match self.storage.total_size().await {
                    Ok(size) => ControlReply::Size { size },
                    Err(err) => ControlReply::Error { error: err.to_string() },
                };
                respond(reply, outcome);
            }
            ControlMessage::Unknown(kind) => {
                tracing::warn!(message_type = %kind, "ignoring unknown control message");
            }
        }
    }

    async fn clear_all(&self) -> Result<usize, Error> {
        let names = self.storage.keys().await?;
        for name in &names {
            self.storage.delete(name).await?;
        }
        Ok(names.len())
    }
}

fn respond(reply: Option<oneshot::Sender<ControlReply>>, outcome: ControlReply) {
    let Some(port) = reply else {
        return;
    };
    if port.send(outcome).is_err() {
        tracing::debug!("reply port closed before the reply was sent");
    }
}
