use crate::errors::ColloquyError;
use crate::providers::base::ProviderMetrics;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// Common error handling for LLM provider HTTP responses.
///
/// Maps HTTP status and provider error bodies onto [`ColloquyError`] so the
/// retry loop can tell transient failures from permanent ones.
pub struct ProviderErrorHandler;

impl ProviderErrorHandler {
    /// Parse an API error response body into a typed error.
    pub fn parse_api_error(status: u16, error_text: &str) -> ColloquyError {
        let retryable = matches!(status, 500 | 502 | 503 | 504 | 529);

        if let Ok(error_json) = serde_json::from_str::<Value>(error_text)
            && let Some(err) = error_json.get("error")
        {
            let error_type = err
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let error_msg = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");

            if error_type == "not_found_error" && error_msg.contains("model:") {
                let model_name = error_msg.replace("model: ", "").trim().to_string();
                return ColloquyError::Provider {
                    message: format!(
                        "Model '{}' not found. It may be deprecated or misspelled; \
                         update the model alias in your configuration (.mcp.config.json).",
                        model_name
                    ),
                    retryable: false,
                };
            }

            return ColloquyError::Provider {
                message: format!("API error ({}): {}", error_type, error_msg),
                retryable,
            };
        }

        ColloquyError::Provider {
            message: format!("API error ({}): {}", status, error_text),
            retryable,
        }
    }

    /// Log provider errors consistently
    pub fn log_error(provider_name: &str, operation: &str, detail: &str) {
        error!("{} provider error during {}: {}", provider_name, operation, detail);
    }

    pub fn rate_limit(status: u16, retry_after: Option<u64>) -> ColloquyError {
        if let Some(seconds) = retry_after {
            warn!("Rate limit hit. Retry after {} seconds", seconds);
        } else {
            warn!("Rate limit hit (status: {})", status);
        }
        ColloquyError::RateLimit { retry_after }
    }

    pub fn auth_error(status: u16, error_text: &str) -> ColloquyError {
        warn!("Authentication error (status: {}): {}", status, error_text);
        ColloquyError::Auth(format!(
            "Authentication failed. Please check your API key. Error: {}",
            error_text
        ))
    }

    /// Count and wrap a request that never got a response (connect, timeout).
    pub fn transport_error(
        err: reqwest::Error,
        provider: &str,
        metrics: &Arc<Mutex<ProviderMetrics>>,
    ) -> anyhow::Error {
        if let Ok(mut m) = metrics.lock() {
            m.error_count += 1;
        }
        Self::log_error(provider, "chat", &err.to_string());
        anyhow::Error::new(err).context(format!("Failed to send request to {provider} API"))
    }

    /// Check HTTP status and return a typed error if the response is not successful.
    /// On error, consumes the response body to extract error details.
    pub async fn check_http_status(
        resp: reqwest::Response,
        provider: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let error_text = resp
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        if status == 429 {
            Self::log_error(provider, "chat", "Rate limit exceeded");
            return Err(Self::rate_limit(status.as_u16(), retry_after).into());
        }

        if status == 401 || status == 403 {
            Self::log_error(provider, "chat", "Authentication failed");
            return Err(Self::auth_error(status.as_u16(), &error_text).into());
        }

        Self::log_error(provider, "chat", "API error");
        Err(Self::parse_api_error(status.as_u16(), &error_text).into())
    }

    /// Check an HTTP response for errors (rate limit, auth, generic API errors).
    /// Returns the response body as JSON on success, or a typed error on failure.
    pub async fn check_response(
        resp: reqwest::Response,
        provider: &str,
        metrics: &Arc<Mutex<ProviderMetrics>>,
    ) -> Result<Value, anyhow::Error> {
        let resp = match Self::check_http_status(resp, provider).await {
            Ok(resp) => resp,
            Err(e) => {
                if let Ok(mut m) = metrics.lock() {
                    m.error_count += 1;
                }
                return Err(e);
            }
        };

        let json: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse {} API response: {}", provider, e))?;

        // Check for API-level errors in the JSON body
        if let Some(error_val) = json.get("error") {
            if let Ok(mut m) = metrics.lock() {
                m.error_count += 1;
            }
            let error_text = serde_json::to_string(&serde_json::json!({ "error": error_val }))
                .unwrap_or_else(|_| "Unknown error".to_string());
            Self::log_error(provider, "chat", "API error in response");
            return Err(Self::parse_api_error(200, &error_text).into());
        }

        Ok(json)
    }
}
