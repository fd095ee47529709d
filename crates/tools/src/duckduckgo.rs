//! DuckDuckGo search through the Instant Answer API.
//!
//! No API key is needed. The endpoint has no dedicated news vertical, so the
//! `news` source runs the same lookup with a news-flavoured query.

use async_trait::async_trait;
use llamantin_core::error::ToolError;
use llamantin_core::tool::Tool;
use tracing::debug;

use crate::common;

const DUCKDUCKGO_BASE_URL: &str = "https://api.duckduckgo.com";

/// Sources the tool accepts.
pub const SOURCES: &[&str] = &["news", "text"];

const MAX_RESULTS: usize = 10;

const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

pub struct DuckDuckGoSearchTool {
    base_url: String,
    default_source: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearchTool {
    pub fn new() -> Self {
        Self {
            base_url: DUCKDUCKGO_BASE_URL.into(),
            default_source: "text".into(),
            client: common::http_client(crate::REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for DuckDuckGoSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn name(&self) -> &str {
        "search_query"
    }

    fn description(&self) -> &str {
        "Search for a query using DuckDuckGo. The source can be \"news\" or \"text\"."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string"
                },
                "source": {
                    "type": "string",
                    "description": "The kind of results to search",
                    "enum": SOURCES,
                    "default": "text"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let query = common::required_query(&arguments)?;
        let source = common::choice(&arguments, "source", SOURCES, &self.default_source)?;

        let q = match source {
            "news" => format!("{query} news"),
            _ => query.to_string(),
        };

        debug!(query = %q, source, "Running DuckDuckGo search");

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", q.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| common::request_failed(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("DuckDuckGo returned {status}"),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| common::request_failed(self.name(), e))?;

        Ok(serde_json::Value::String(render_results(&body)))
    }
}

/// Flatten an Instant Answer response into text.
fn render_results(body: &serde_json::Value) -> String {
    let mut snippets: Vec<String> = Vec::new();

    for key in ["Answer", "AbstractText", "Definition"] {
        if let Some(text) = body[key].as_str().filter(|t| !t.is_empty()) {
            snippets.push(text.to_string());
        }
    }

    let mut topics = Vec::new();
    for key in ["Results", "RelatedTopics"] {
        if let Some(list) = body[key].as_array() {
            collect_topics(list, &mut topics);
        }
    }
    snippets.extend(topics.into_iter().take(MAX_RESULTS));

    if snippets.is_empty() {
        NO_RESULTS.to_string()
    } else {
        snippets.join(" ")
    }
}

/// Related topics nest one level deep under named groups.
fn collect_topics(list: &[serde_json::Value], out: &mut Vec<String>) {
    for topic in list {
        if let Some(text) = topic["Text"].as_str().filter(|t| !t.is_empty()) {
            out.push(text.to_string());
        } else if let Some(nested) = topic["Topics"].as_array() {
            collect_topics(nested, out);
        }
    }
}
