//! rmcp server handler for the `generate_trip` tool
//!
//! [`McpServer`] advertises the tool and hands every call to the
//! [`EndpointHandler`]. Transports only decide where the [`CallContext`] and
//! [`Credentials`] come from: the HTTP service stores both in the request
//! extensions, stdio falls back to the credentials given at startup.

use std::fmt;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam as CallToolRequestParams, CallToolResult, Content, ErrorCode, ErrorData, Implementation,
    ListToolsResult, PaginatedRequestParam as PaginatedRequestParams, ProtocolVersion, ResourceContents,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use tripkit_lib::{render_html, tool_definition, ResponseEnvelope, WidgetPayload, TOOL_NAME};
use uuid::Uuid;

use crate::auth::Credentials;
use crate::handler::{CallContext, EndpointHandler};

pub const SERVER_NAME: &str = "tripkit";

/// Server-defined JSON-RPC code for a caller over its request allowance.
pub const RATE_LIMITED: i32 = -32000;

const INSTRUCTIONS: &str = "Use generate_trip to plan a day-by-day itinerary for a destination \
and date range. Dates are ISO calendar dates (YYYY-MM-DD) and trips are limited to 14 days.";

/// Called with every envelope a tool call produces.
pub type EnvelopeObserver = Arc<dyn Fn(&ResponseEnvelope) + Send + Sync>;

#[derive(Clone)]
pub struct McpServer {
    handler: Arc<EndpointHandler>,
    credentials: Credentials,
    observer: Option<EnvelopeObserver>,
}

impl fmt::Debug for McpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpServer")
            .field("handler", &self.handler)
            .field("credentials", &self.credentials)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl McpServer {
    pub fn new(handler: Arc<EndpointHandler>) -> Self {
        Self {
            handler,
            credentials: Credentials::default(),
            observer: None,
        }
    }

    /// Credentials used when the transport supplies none (stdio).
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_observer(mut self, observer: EnvelopeObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn handler(&self) -> &Arc<EndpointHandler> {
        &self.handler
    }

    /// Server summary served to plain `GET` discovery requests.
    pub fn description(&self) -> Value {
        let info = self.get_info();
        json!({
            "name": info.server_info.name,
            "version": info.server_info.version,
            "protocolVersion": info.protocol_version,
            "capabilities": info.capabilities,
        })
    }

    /// Context and credentials for one call.
    ///
    /// HTTP requests carry both in the extensions of their [`http::request::Parts`].
    fn call_scope(&self, parts: Option<&http::request::Parts>) -> (CallContext, Credentials) {
        let ctx = parts
            .and_then(|p| p.extensions.get::<CallContext>())
            .cloned()
            .unwrap_or_else(|| self.handler.context(Uuid::now_v7().to_string()));
        let credentials = parts
            .and_then(|p| p.extensions.get::<Credentials>())
            .cloned()
            .unwrap_or_else(|| self.credentials.clone());
        (ctx, credentials)
    }
}

/// The tool descriptor in rmcp's model.
pub fn tool() -> Result<Tool, ErrorData> {
    serde_json::to_value(tool_definition())
        .and_then(serde_json::from_value)
        .map_err(|e| ErrorData::internal_error(format!("invalid tool descriptor: {}", e), None))
}

/// JSON-RPC error returned to rate limited MCP clients.
pub fn rate_limited_error(window_secs: u64) -> ErrorData {
    ErrorData::new(
        ErrorCode(RATE_LIMITED),
        format!("Rate limit exceeded. Try again in {} seconds.", window_secs),
        None,
    )
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: vec![tool()?],
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if request.name != TOOL_NAME {
            warn!(tool = %request.name, "unknown tool requested");
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", request.name),
                None,
            ));
        }

        let (ctx, credentials) = self.call_scope(context.extensions.get::<http::request::Parts>());
        debug!(request_id = %ctx.request_id, "tools/call {}", TOOL_NAME);

        let arguments = Value::Object(request.arguments.unwrap_or_else(Map::new));
        let envelope = self.handler.handle(&ctx, &credentials, &arguments).await;
        if let Some(observer) = &self.observer {
            observer(&envelope);
        }
        Ok(tool_result(&envelope))
    }
}

/// Shape an envelope as an MCP `tools/call` result.
///
/// The envelope itself is the structured content. A successful call also
/// carries the summary text and the rendered widget as an embedded resource.
pub fn tool_result(envelope: &ResponseEnvelope) -> CallToolResult {
    let content = match (&envelope.data, &envelope.error) {
        (Some(payload), _) => vec![Content::text(payload.summary.clone()), widget(payload)],
        (None, Some(error)) => vec![Content::text(error.message.clone())],
        (None, None) => Vec::new(),
    };

    let mut result = if envelope.ok {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    };
    result.structured_content = serde_json::to_value(envelope).ok();
    result
}

fn widget(payload: &WidgetPayload) -> Content {
    let mut resource = ResourceContents::text(
        render_html(payload),
        format!("widget://itinerary/{}", payload.trip_id),
    );
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut resource {
        *mime_type = Some("text/html".to_string());
    }
    Content::resource(resource)
}
