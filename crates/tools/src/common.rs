//! Argument handling shared by the search tools.

use llamantin_core::error::ToolError;

/// Extract the non-empty `query` argument.
pub(crate) fn required_query(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    let query = arguments["query"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
    let query = query.trim();
    if query.is_empty() {
        return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
    }
    Ok(query)
}

/// Read an optional enum argument, falling back to `default` when absent.
pub(crate) fn choice<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
    allowed: &[&str],
    default: &'a str,
) -> Result<&'a str, ToolError> {
    match arguments.get(key) {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(serde_json::Value::String(v)) if allowed.contains(&v.as_str()) => Ok(v.as_str()),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be one of {}, got {other}",
            allowed.join(", ")
        ))),
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(crate) fn request_failed(tool_name: &str, e: reqwest::Error) -> ToolError {
    if e.is_timeout() {
        ToolError::Timeout {
            tool_name: tool_name.into(),
            timeout_secs: crate::REQUEST_TIMEOUT_SECS,
        }
    } else {
        ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: e.to_string(),
        }
    }
}
