//! Google search through the Serper API.
//!
//! `POST https://google.serper.dev/{type}` with the `X-API-KEY` header. The
//! JSON response is flattened into a paragraph of snippets for the model.

use async_trait::async_trait;
use llamantin_core::error::ToolError;
use llamantin_core::tool::Tool;
use tracing::debug;

use crate::common;

const SERPER_BASE_URL: &str = "https://google.serper.dev";

/// Search verticals Serper exposes.
pub const SEARCH_TYPES: &[&str] = &["news", "search", "places", "images"];

/// How many results of each list are kept.
const MAX_RESULTS: usize = 10;

const NO_RESULTS: &str = "No good Google Search Result was found";

pub struct SerperSearchTool {
    api_key: String,
    base_url: String,
    default_type: String,
    client: reqwest::Client,
}

impl SerperSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: SERPER_BASE_URL.into(),
            default_type: "search".into(),
            client: common::http_client(crate::REQUEST_TIMEOUT_SECS),
        }
    }

    /// Point the tool at a different Serper-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    fn name(&self) -> &str {
        "search_query"
    }

    fn description(&self) -> &str {
        "Search for a query using Google. The type of search can be \"news\", \"search\", \"places\", or \"images\"."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string"
                },
                "type": {
                    "type": "string",
                    "description": "The type of search to be performed",
                    "enum": SEARCH_TYPES,
                    "default": "search"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = common::required_query(&arguments)?;
        let search_type = common::choice(&arguments, "type", SEARCH_TYPES, &self.default_type)?;

        debug!(query, search_type, "Running Serper search");

        let response = self
            .client
            .post(format!("{}/{search_type}", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(|e| common::request_failed(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Serper returned {status}: {body}"),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| common::request_failed(self.name(), e))?;

        Ok(serde_json::Value::String(render_results(&body, search_type)))
    }
}

/// The list in a Serper response that holds results for `search_type`.
fn result_key(search_type: &str) -> &'static str {
    match search_type {
        "news" => "news",
        "places" => "places",
        "images" => "images",
        _ => "organic",
    }
}

/// Flatten a Serper response into text.
fn render_results(body: &serde_json::Value, search_type: &str) -> String {
    let mut snippets: Vec<String> = Vec::new();

    if let Some(answer_box) = body.get("answerBox") {
        let direct = ["answer", "snippet"]
            .iter()
            .find_map(|k| answer_box.get(*k).and_then(|v| v.as_str()));
        if let Some(answer) = direct {
            return answer.replace('\n', " ");
        }
        if let Some(highlighted) = answer_box.get("snippetHighlighted").and_then(|v| v.as_array()) {
            let joined: Vec<&str> = highlighted.iter().filter_map(|v| v.as_str()).collect();
            if !joined.is_empty() {
                return joined.join(", ");
            }
        }
    }

    if let Some(kg) = body.get("knowledgeGraph") {
        let title = kg["title"].as_str().unwrap_or_default();
        if let Some(kind) = kg["type"].as_str() {
            snippets.push(format!("{title}: {kind}."));
        }
        if let Some(description) = kg["description"].as_str() {
            snippets.push(description.to_string());
        }
        if let Some(attributes) = kg["attributes"].as_object() {
            for (attribute, value) in attributes {
                if let Some(value) = value.as_str() {
                    snippets.push(format!("{title} {attribute}: {value}."));
                }
            }
        }
    }

    if let Some(results) = body[result_key(search_type)].as_array() {
        for result in results.iter().take(MAX_RESULTS) {
            match result["snippet"].as_str() {
                Some(snippet) => snippets.push(snippet.to_string()),
                None => {
                    if let Some(title) = result["title"].as_str() {
                        snippets.push(title.to_string());
                    }
                }
            }
            if let Some(attributes) = result["attributes"].as_object() {
                for (attribute, value) in attributes {
                    if let Some(value) = value.as_str() {
                        snippets.push(format!("{attribute}: {value}."));
                    }
                }
            }
        }
    }

    if snippets.is_empty() {
        NO_RESULTS.to_string()
    } else {
        snippets.join(" ")
    }
}
