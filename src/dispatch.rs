//! Request Dispatcher
//!
//! The single point where tool lookups happen and handler failures are
//! converted into structured error envelopes. Nothing past this boundary
//! ever sees a raw handler error, and `dispatch` itself never fails.

use {
    crate::logging,
    crate::tools::ToolRegistry,
    crate::types::{RequestEnvelope, ResponseEnvelope},
    serde_json::{json, Value},
    std::sync::Arc,
    tracing::debug,
};

pub struct RequestDispatcher {
    registry: Arc<ToolRegistry>,
}

impl RequestDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatch one tool invocation. Infallible: every outcome, including an
    /// unknown tool name or a handler failure, is a well-formed envelope.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ResponseEnvelope {
        logging::log_tool_call(name, &arguments);

        let Some(tool) = self.registry.resolve(name) else {
            logging::log_unknown_tool(name);
            return ResponseEnvelope::error(format!("Unknown tool: {name}"));
        };

        match tool.handler().call(arguments).await {
            Ok(envelope) => {
                debug!(tool = %name, event = "dispatch_ok", "Tool handler completed");
                envelope
            }
            Err(e) => {
                logging::log_handler_error(name, &e.to_string());
                let body = json!({
                    "error": e.to_string(),
                    "status": "failed"
                });
                ResponseEnvelope::error(body.to_string())
            }
        }
    }

    pub async fn dispatch_envelope(&self, request: RequestEnvelope) -> ResponseEnvelope {
        self.dispatch(&request.name, request.arguments).await
    }
}
