//! Structured Logging
//!
//! Tracing setup and structured event helpers for the advisor server.
//! All log output goes to stderr: in stdio mode stdout is the protocol
//! channel and must stay clean.

use {
    tracing::{error, info, warn},
    tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
    uuid::Uuid,
};

/// Initialize the tracing subscriber with appropriate configuration
pub fn init_tracing() {
    // Try to get log level from environment, default to info
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("advisor_mcp=info,warp=info"));

    // Check if JSON format is requested
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if json_format {
        // JSON format for production/structured logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        // Human-readable format for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    info!("Tracing initialized");
}

/// Identifies one SSE connection across its lifecycle logs.
#[derive(Debug, Clone)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log tool events
pub fn log_tool_call(tool: &str, args: &serde_json::Value) {
    info!(
        tool = %tool,
        args = ?args,
        event = "tool_call",
        "Tool call requested"
    );
}

pub fn log_unknown_tool(tool: &str) {
    warn!(
        tool = %tool,
        event = "unknown_tool",
        "Unknown tool requested"
    );
}

pub fn log_handler_error(tool: &str, error: &str) {
    error!(
        tool = %tool,
        error = %error,
        event = "handler_error",
        "Tool handler failed"
    );
}

/// Log session lifecycle events
pub fn log_session_opened(connection_id: &ConnectionId, session_id: &str) {
    info!(
        connection_id = %connection_id,
        session_id = %session_id,
        event = "session_opened",
        "Session opened"
    );
}

pub fn log_session_closed(session_id: &str) {
    info!(
        session_id = %session_id,
        event = "session_closed",
        "Session closed"
    );
}

pub fn log_unroutable_session(session_id: &str) {
    warn!(
        session_id = %session_id,
        event = "unroutable_session",
        "Message for unknown session rejected"
    );
}

/// Server lifecycle logging
pub fn log_server_startup(port: u16) {
    info!(
        port = port,
        event = "server_startup",
        "Starting advisor server"
    );
}

pub fn log_server_ready(addr: &str) {
    info!(
        address = %addr,
        event = "server_ready",
        "Advisor server ready and listening"
    );
}
