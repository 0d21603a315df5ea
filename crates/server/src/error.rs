// crates/server/src/error.rs
use rmcp::model::ErrorData;
use thiserror::Error;

/// Rejections of a `tools/call` before the bridge is involved.
///
/// These become JSON-RPC errors. Failures of an accepted call are reported
/// as tool results with `isError` set instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: `input` must be a string, got {0}")]
    InvalidInput(String),
}

impl From<ToolError> for ErrorData {
    fn from(err: ToolError) -> Self {
        ErrorData::invalid_params(err.to_string(), None)
    }
}
