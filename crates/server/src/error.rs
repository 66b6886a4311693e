//! Errors raised while translating tool parameters into engine requests.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Not a valid HTTP method token.
    #[error("INVALID_INPUT: invalid method: {0}")]
    InvalidMethod(String),

    /// Header name or value that cannot be sent.
    #[error("INVALID_INPUT: invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Neither or both lookup keys were supplied.
    #[error("INVALID_INPUT: {0}")]
    MissingKey(&'static str),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        McpError { code: ErrorCode(-32602), message: err.to_string().into(), data: None }
    }
}
