//! Native Ollama provider.
//!
//! Talks to Ollama's own `/api/chat` and `/api/embed` endpoints rather than the
//! OpenAI-compatible shim, so tool-call arguments arrive as JSON objects.

use async_trait::async_trait;
use llamantin_core::error::ProviderError;
use llamantin_core::message::{Role, ToolCall, Turn};
use llamantin_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http;

/// Default address of a local Ollama daemon.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// A chat model served by Ollama.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::client(),
        }
    }

    /// The request body for `/api/chat`.
    fn to_api_request(request: &ProviderRequest) -> ApiChatRequest {
        ApiChatRequest {
            model: request.model.clone(),
            messages: request.turns.iter().map(Self::to_api_message).collect(),
            tools: request
                .tools
                .iter()
                .map(|t| ApiToolDefinition {
                    r#type: "function".into(),
                    function: ApiToolFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
            stream: false,
            options: ApiOptions {
                temperature: request.temperature,
            },
        }
    }

    fn to_api_message(turn: &Turn) -> ApiMessage {
        ApiMessage {
            role: turn.role.as_str().into(),
            content: turn.content.clone(),
            tool_calls: turn.tool_call.as_ref().map(|tc| {
                vec![ApiToolCall {
                    function: ApiFunction {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                }]
            }),
            tool_name: turn.tool_name.clone(),
        }
    }

    /// Turn a decoded `/api/chat` response into a model reply.
    fn to_reply(message: ApiMessage) -> Result<ModelReply, ProviderError> {
        let role = match message.role.as_str() {
            "assistant" => Role::Assistant,
            "user" => Role::User,
            "system" => Role::System,
            "tool" => Role::Tool,
            other => {
                return Err(ProviderError::MalformedReply(format!(
                    "unexpected message role: {other}"
                )));
            }
        };

        let calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = normalize_arguments(tc.function.arguments)?;
                Ok(ToolCall::new(tc.function.name, arguments))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        let mut reply = ModelReply::from_tool_calls(message.content, calls);
        reply.role = role;
        Ok(reply)
    }
}

/// Some models emit arguments as a JSON-encoded string instead of an object.
fn normalize_arguments(arguments: serde_json::Value) -> Result<serde_json::Value, ProviderError> {
    match arguments {
        serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            ProviderError::MalformedReply(format!("tool-call arguments are not valid JSON: {e}"))
        }),
        serde_json::Value::Null => Ok(serde_json::Value::Object(serde_json::Map::new())),
        other => Ok(other),
    }
}

fn to_usage(prompt: Option<u32>, completion: Option<u32>) -> Option<Usage> {
    match (prompt, completion) {
        (None, None) => None,
        (prompt, completion) => {
            let prompt_tokens = prompt.unwrap_or(0);
            let completion_tokens = completion.unwrap_or(0);
            Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            })
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::to_api_request(&request);

        debug!(
            provider = "ollama",
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;
        let api_response: ApiChatResponse = http::decode(response).await?;

        let usage = to_usage(api_response.prompt_eval_count, api_response.eval_count);

        Ok(ProviderResponse {
            reply: Self::to_reply(api_response.message)?,
            usage,
            model: api_response.model,
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
        });

        debug!(
            provider = "ollama",
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(self.name(), response).await?;
        let api_resp: ApiEmbedResponse = http::decode(response).await?;

        Ok(EmbeddingResponse {
            embeddings: api_resp.embeddings,
            model: api_resp.model,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;
        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiToolDefinition>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    model: String,
    message: ApiMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedResponse {
    model: String,
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OllamaProvider::new("http://localhost:11434/");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn request_carries_tools_and_temperature() {
        let request = ProviderRequest {
            model: "mistral-nemo".into(),
            turns: vec![Turn::user("What is 7 + 13?")],
            temperature: 0.0,
            tools: vec![ToolDefinition {
                name: "add_two_numbers".into(),
                description: "Add two numbers".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };
        let body = serde_json::to_value(OllamaProvider::to_api_request(&request)).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["tools"][0]["function"]["name"], "add_two_numbers");
    }

    #[test]
    fn tool_turns_are_sent_with_tool_name() {
        let call = ToolCall::new("add_two_numbers", serde_json::json!({"a": 7, "b": 13}));
        let messages = [
            Turn::assistant_with_tool_call("", call),
            Turn::tool_result("add_two_numbers", "20"),
        ];
        let api: Vec<ApiMessage> = messages.iter().map(OllamaProvider::to_api_message).collect();

        let tc = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc[0].function.arguments["a"], 7);
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_name.as_deref(), Some("add_two_numbers"));
    }

    #[test]
    fn decode_plain_reply() {
        let data = r#"{
            "model": "mistral-nemo",
            "message": {"role": "assistant", "content": "The answer is 20."},
            "done": true,
            "prompt_eval_count": 30,
            "eval_count": 6
        }"#;
        let parsed: ApiChatResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.eval_count, Some(6));
        let reply = OllamaProvider::to_reply(parsed.message).unwrap();
        assert_eq!(reply.content, "The answer is 20.");
        assert!(reply.tool_call.is_none());
    }

    #[test]
    fn decode_tool_call_reply() {
        let data = r#"{
            "model": "mistral-nemo",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "add_two_numbers", "arguments": {"a": 7, "b": 13}}},
                    {"function": {"name": "add_two_numbers", "arguments": {"a": 1, "b": 1}}}
                ]
            },
            "done": true
        }"#;
        let parsed: ApiChatResponse = serde_json::from_str(data).unwrap();
        let reply = OllamaProvider::to_reply(parsed.message).unwrap();
        let call = reply.tool_call.unwrap();
        assert_eq!(call.name, "add_two_numbers");
        assert_eq!(call.arguments, serde_json::json!({"a": 7, "b": 13}));
    }

    #[test]
    fn string_arguments_are_parsed() {
        let value = normalize_arguments(serde_json::json!(r#"{"query": "rust"}"#)).unwrap();
        assert_eq!(value["query"], "rust");
    }

    #[test]
    fn garbage_arguments_are_malformed() {
        let err = normalize_arguments(serde_json::json!("{not json")).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedReply(_)));
    }

    #[test]
    fn unknown_role_is_malformed() {
        let message = ApiMessage {
            role: "narrator".into(),
            content: "once upon a time".into(),
            tool_calls: None,
            tool_name: None,
        };
        assert!(matches!(
            OllamaProvider::to_reply(message),
            Err(ProviderError::MalformedReply(_))
        ));
    }

    #[test]
    fn usage_from_eval_counts() {
        assert!(to_usage(None, None).is_none());

        let usage = to_usage(Some(30), None).unwrap();
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn usage_total_saturates() {
        let usage = to_usage(Some(u32::MAX), Some(1)).unwrap();
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, u32::MAX);
    }

    #[test]
    fn decode_embed_response() {
        let data = r#"{"model": "nomic-embed-text", "embeddings": [[0.1, 0.2], [0.3, 0.4]]}"#;
        let parsed: ApiEmbedResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1], vec![0.3, 0.4]);
    }
}
