//! Shared test helpers: a scripted provider and a few toy tools.

use async_trait::async_trait;
use llamantin_core::error::{ProviderError, ToolError};
use llamantin_core::message::ToolCall;
use llamantin_core::provider::{ModelReply, Provider, ProviderRequest, ProviderResponse, Usage};
use llamantin_core::tool::Tool;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request it was given.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    call_count: Mutex<usize>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first requests a tool, then answers.
    pub fn tool_then_answer(call: ToolCall, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(call, thought),
            make_text_response(answer),
        ])
    }

    /// Create a provider whose only consultation fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        self.requests.lock().unwrap().push(request);
        let response = responses[*count].clone();
        *count += 1;
        response
    }
}

/// Wrap a reply in a response with fixed usage.
pub fn make_response(reply: ModelReply) -> ProviderResponse {
    ProviderResponse {
        reply,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    make_response(ModelReply::text(text))
}

/// Create a response requesting a tool, with optional narration.
pub fn make_tool_call_response(call: ToolCall, thought: &str) -> ProviderResponse {
    make_response(ModelReply::tool_call(thought, call))
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(name, args)
}

/// Adds `a` and `b`, returning a JSON number.
pub struct AddTwoNumbers;

#[async_trait]
impl Tool for AddTwoNumbers {
    fn name(&self) -> &str {
        "add_two_numbers"
    }

    fn description(&self) -> &str {
        "Add two numbers"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let a = arguments["a"]
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments("'a' must be an integer".into()))?;
        let b = arguments["b"]
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments("'b' must be an integer".into()))?;
        Ok(serde_json::json!(a + b))
    }
}

/// Always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Fails every time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "backend down".into(),
        })
    }
}

/// Succeeds with no output.
pub struct SilentTool;

#[async_trait]
impl Tool for SilentTool {
    fn name(&self) -> &str {
        "silent"
    }

    fn description(&self) -> &str {
        "Returns nothing"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::Value::Null)
    }
}
