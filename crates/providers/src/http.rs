//! Shared HTTP plumbing for the providers.

use llamantin_core::error::ProviderError;
use tracing::warn;

/// Request timeout applied to every provider client.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Build the HTTP client used by a provider.
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a transport failure onto the provider taxonomy.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    ProviderError::from_transport(e.is_timeout(), e.to_string())
}

/// Fail on any non-success status, consuming the body for the message.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

/// Read a JSON body, reporting undecodable payloads as malformed replies.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::MalformedReply(format!("Failed to parse response: {e}")))
}
