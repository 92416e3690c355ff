//! MCP (Model Context Protocol) server for Tripkit
//!
//! Exposes the `generate_trip` tool to AI assistants through `rmcp`.
//!
//! # Architecture
//!
//! - `handler`: the authenticate, validate, generate, format pipeline
//! - `auth`: the authenticator seam and its implementations
//! - `server`: the [`rmcp::ServerHandler`] and tool result shaping
//!
//! # Transport
//!
//! The `tripkit-mcp` binary serves [`McpServer`] over stdio. All logging goes
//! to stderr to keep stdout clean for the protocol. The streamable HTTP
//! transport lives in `tripkit-service-mcp` and serves the same handler.

pub mod auth;
pub mod handler;
pub mod server;

pub use auth::{
    authenticator_from_env, AnonymousAuthenticator, ApiKeyAuthenticator, Authenticator,
    CallerIdentity, Credentials,
};
pub use handler::{CallContext, CallStage, EndpointHandler, RetryPolicy};
pub use server::{
    rate_limited_error, tool, tool_result, EnvelopeObserver, McpServer, RATE_LIMITED, SERVER_NAME,
};
