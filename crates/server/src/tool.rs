// crates/server/src/tool.rs
//! MCP server exposing the bridge as the `long_running_task` tool.

use std::sync::Arc;

use async_trait::async_trait;
use mcp_facade_core::{
    JobBridge, NotifyError, ProgressNotification, ProgressSink, ProgressToken, ToolCall,
};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParams, ProgressNotificationParam, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::{Peer, RequestContext, RoleServer};
use rmcp::ServerHandler;
use serde_json::{json, Value};

use crate::error::ToolError;

pub const TOOL_NAME: &str = "long_running_task";
pub const SERVER_NAME: &str = "mcp-facade";

/// Header carrying the Streamable HTTP session id.
const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Clone)]
pub struct FacadeServer {
    bridge: Arc<JobBridge>,
}

impl FacadeServer {
    pub fn new(bridge: Arc<JobBridge>) -> Self {
        Self { bridge }
    }

    pub fn tool() -> Tool {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "input": { "type": "string", "default": "" }
            }
        });
        Tool {
            name: TOOL_NAME.into(),
            title: None,
            description: Some(
                "Start a long-running backend job and stream its progress until it finishes."
                    .into(),
            ),
            input_schema: Arc::new(input_schema.as_object().cloned().unwrap_or_default()),
            output_schema: None,
            annotations: None,
            execution: None,
            icons: None,
            meta: None,
        }
    }

    async fn run(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if request.name != TOOL_NAME {
            return Err(ToolError::UnknownTool(request.name.to_string()).into());
        }
        let call = tool_call(request.arguments.as_ref(), &context)?;
        let sink = Arc::new(PeerProgressSink {
            peer: context.peer.clone(),
        });

        match self.bridge.call(call, sink).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

/// Read the `input` argument; absent means empty.
pub fn input_argument(arguments: Option<&JsonObject>) -> Result<String, ToolError> {
    match arguments.and_then(|args| args.get("input")) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(input)) => Ok(input.clone()),
        Some(other) => Err(ToolError::InvalidInput(json_type(other).to_string())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn tool_call(
    arguments: Option<&JsonObject>,
    context: &RequestContext<RoleServer>,
) -> Result<ToolCall, ToolError> {
    let progress_token = context
        .meta
        .get_progress_token()
        .and_then(|token| serde_json::to_value(token).ok())
        .or_else(|| serde_json::to_value(&context.id).ok())
        .map(ProgressToken::new);

    let mut call = ToolCall::new(input_argument(arguments)?).with_cancel(context.ct.clone());
    call.progress_token = progress_token;

    // only present on the Streamable HTTP transport
    if let Some(parts) = context.extensions.get::<http::request::Parts>() {
        if let Some(auth) = header_str(&parts.headers, http::header::AUTHORIZATION.as_str()) {
            call = call.with_authorization(auth);
        }
        if let Some(session) = header_str(&parts.headers, SESSION_HEADER) {
            call = call.with_session(session);
        }
    }
    Ok(call)
}

fn header_str<'a>(headers: &'a http::HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Sends `notifications/progress` to the client that made the call.
struct PeerProgressSink {
    peer: Peer<RoleServer>,
}

#[async_trait]
impl ProgressSink for PeerProgressSink {
    async fn send_progress(&self, notification: ProgressNotification) -> Result<(), NotifyError> {
        let progress_token = serde_json::from_value(notification.progress_token.into_value())
            .map_err(|e| NotifyError::new(format!("unusable progress token: {e}")))?;
        self.peer
            .notify_progress(ProgressNotificationParam {
                progress_token,
                progress: notification.progress,
                total: Some(notification.total),
                message: Some(notification.message),
            })
            .await
            .map_err(|e| NotifyError::new(e.to_string()))
    }
}

impl ServerHandler for FacadeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            instructions: Some(format!(
                "Call `{TOOL_NAME}` with an `input` string. Progress arrives as notifications; \
                 the result is the job's final text."
            )),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(vec![Self::tool()])))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        self.run(request, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_input_argument() {
        assert_eq!(input_argument(None), Ok(String::new()));
        assert_eq!(input_argument(Some(&args(json!({})))), Ok(String::new()));
        assert_eq!(
            input_argument(Some(&args(json!({ "input": "hello" })))),
            Ok("hello".to_string())
        );
        assert_eq!(
            input_argument(Some(&args(json!({ "input": 42 })))),
            Err(ToolError::InvalidInput("number".into()))
        );
    }

    #[test]
    fn test_tool_schema() {
        let tool = FacadeServer::tool();
        assert_eq!(tool.name, TOOL_NAME);
        assert_eq!(
            Value::Object((*tool.input_schema).clone()),
            json!({
                "type": "object",
                "properties": { "input": { "type": "string", "default": "" } }
            })
        );
    }
}
