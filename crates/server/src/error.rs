//! Errors raised by the tool layer itself, before or after the core runs.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the sslwatch server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool parameters (e.g., page limit out of range).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool result could not be rendered as JSON.
    #[error("SERIALIZE_FAILED: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::SerializeFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
