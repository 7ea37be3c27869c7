//! Tool Registry
//!
//! The static set of tools this server exposes, their input schemas, and
//! their handler implementations. The registry is built once at startup and
//! read-only for the rest of the process lifetime.

use {
    crate::error::{AdvisorError, AdvisorResult},
    crate::types::{AdvisorRequest, ResponseEnvelope},
    async_trait::async_trait,
    schemars::schema_for,
    serde_json::{json, Value},
    std::sync::Arc,
    tracing::debug,
};

/// A tool implementation. Handlers receive the raw caller arguments and
/// return a complete response envelope; any Err is converted to a structured
/// error envelope at the dispatcher boundary.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> AdvisorResult<ResponseEnvelope>;
}

/// A registered tool: name, description, input schema, and handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            handler,
        }
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        self.handler.clone()
    }
}

pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Build the standard registry containing the `stack_advisor` tool.
    pub fn new() -> Self {
        let input_schema = serde_json::to_value(schema_for!(AdvisorRequest))
            .unwrap_or_else(|_| json!({"type": "object"}));

        Self::with_tools(vec![ToolDescriptor::new(
            "stack_advisor",
            "Interactive infrastructure stack advisor. Presents one question \
             per call and echoes the caller-owned interview state back \
             unchanged for re-submission on the next turn.",
            input_schema,
            Arc::new(StackAdvisor),
        )])
    }

    /// Build a registry from an explicit tool list. Registration order is
    /// the order `list_tools` reports.
    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The advisor tool. Fully stateless: every field the caller submitted is
/// copied into the response payload and `state` is returned deep-equal to
/// what came in.
struct StackAdvisor;

#[async_trait]
impl ToolHandler for StackAdvisor {
    async fn call(&self, arguments: Value) -> AdvisorResult<ResponseEnvelope> {
        let request: AdvisorRequest = serde_json::from_value(arguments)
            .map_err(|e| AdvisorError::InvalidArguments(e.to_string()))?;

        if request.question_number == 0 {
            return Err(AdvisorError::InvalidArguments(
                "questionNumber must be >= 1".to_string(),
            ));
        }
        if request.total_questions == 0 {
            return Err(AdvisorError::InvalidArguments(
                "totalQuestions must be >= 1".to_string(),
            ));
        }

        debug!(
            question_number = request.question_number,
            total_questions = request.total_questions,
            next_question_needed = request.next_question_needed,
            event = "advisor_turn",
            "Advisor turn"
        );

        let mut payload = serde_json::Map::new();
        payload.insert("display_text".to_string(), json!(request.question));
        payload.insert("questionNumber".to_string(), json!(request.question_number));
        payload.insert("totalQuestions".to_string(), json!(request.total_questions));
        payload.insert(
            "nextQuestionNeeded".to_string(),
            json!(request.next_question_needed),
        );
        if let Some(answer) = request.answer {
            payload.insert("answer".to_string(), json!(answer));
        }
        if let Some(components) = request.suggested_components {
            payload.insert("suggestedComponents".to_string(), json!(components));
        }
        if let Some(requirements) = request.requirements {
            payload.insert("requirements".to_string(), json!(requirements));
        }
        payload.insert("state".to_string(), request.state);

        let text = serde_json::to_string(&Value::Object(payload))?;
        Ok(ResponseEnvelope::text(text))
    }
}
