//! Tool-level errors for the swcache server.
//!
//! Worker errors convert through `swcache_core::Error`; these cover input the
//! tools reject before reaching the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool parameters (e.g., unknown method, bad header).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("ENCODE_FAILED: {0}")]
    EncodeFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::EncodeFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

/// Serialize tool output as pretty JSON text content.
pub fn json_result<T: serde::Serialize>(output: &T) -> Result<rmcp::model::CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::EncodeFailed(e.to_string()))?;
    Ok(rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("bad method".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "bad method");
    }

    #[test]
    fn test_display_has_code_prefix() {
        assert_eq!(ToolError::EncodeFailed("x".into()).to_string(), "ENCODE_FAILED: x");
    }
}
