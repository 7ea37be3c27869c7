//! Wire Types
//!
//! Request/response envelopes shared by both transports, plus the typed
//! input shape of the advisor tool.

use {
    schemars::JsonSchema,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A single tool invocation as it arrives on the wire: a tool name plus
/// caller-defined arguments the core does not interpret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEnvelope {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// One ordered block of response content. Only text blocks exist today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// The uniform response wrapper both transports deliver. `is_error` defaults
/// to false and is omitted from the wire when false.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub content: Vec<ContentBlock>,
    #[serde(
        rename = "isError",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_error: bool,
}

impl ResponseEnvelope {
    /// Successful envelope carrying a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// Error envelope carrying a single text block.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
        }
    }
}

/// Typed input of the `stack_advisor` tool.
///
/// `state` is an opaque caller-owned object. The server never inspects it
/// beyond requiring it to deserialize; it is returned deep-equal to what the
/// caller submitted so the caller can re-submit it on the next turn.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorRequest {
    /// The question the advisor should present to the user
    pub question: String,
    /// 1-based index of this question in the interview
    pub question_number: u32,
    /// Total number of questions the interview expects to ask
    pub total_questions: u32,
    /// Whether the caller intends to ask a further question after this one
    pub next_question_needed: bool,
    /// The user's answer to the previous question, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Infrastructure components suggested so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_components: Option<Vec<String>>,
    /// Requirements gathered so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    /// Opaque caller-owned conversation state, round-tripped unmodified
    #[serde(default = "empty_state")]
    pub state: Value,
}

fn empty_state() -> Value {
    Value::Object(serde_json::Map::new())
}
