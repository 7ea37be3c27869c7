//! Stack Advisor Server Library
//!
//! An interactive infrastructure advisory tool served over two transports:
//! a line-oriented stdio channel (one implicit session per process) and an
//! HTTP channel pairing long-lived Server-Sent-Event streams with POSTed
//! messages.
//!
//! The advisory content itself is a structural pass-through: the caller owns
//! all conversation state and the server faithfully echoes it back. What this
//! crate actually provides is the transport/session layer around that tool.

pub mod dispatch;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;
pub mod stdio;
pub mod tools;
pub mod types;

// Re-export key types
pub use dispatch::RequestDispatcher;
pub use error::{AdvisorError, AdvisorResult};
pub use http::SseServer;
pub use session::SessionTable;
pub use stdio::StdioChannel;
pub use tools::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use types::{AdvisorRequest, ContentBlock, RequestEnvelope, ResponseEnvelope};
