//! Shared HTTP plumbing for the model providers
//!
//! Maps transport failures and HTTP statuses onto [`GatewayError`] so the
//! model client can decide what to retry:
//!
//! | Condition | Error | Retried |
//! |-----------|-------|---------|
//! | 429 | `RateLimited` (honors `retry-after`) | yes |
//! | 5xx | `ServerError` | yes |
//! | connect failure | `ConnectionError` | yes |
//! | request timeout | `Timeout` | yes |
//! | other 4xx | `RequestFailed` | no |

use patchpilot_application::GatewayError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Build a client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Other(format!("Failed to create HTTP client: {}", e)))
}

/// POST a JSON body and return the parsed JSON response.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
) -> Result<Value, GatewayError> {
    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, value);
    }

    let response = request.send().await.map_err(from_reqwest)?;
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(response.headers());
    let text = response.text().await.map_err(from_reqwest)?;
    debug!(url, status, bytes = text.len(), "Provider response");

    if !(200..300).contains(&status) {
        return Err(classify_status(status, retry_after, &text));
    }

    serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

/// Classify a non-success HTTP status.
pub(crate) fn classify_status(status: u16, retry_after: Option<Duration>, body: &str) -> GatewayError {
    let message = error_message(body);
    match status {
        429 => GatewayError::RateLimited { retry_after },
        500..=599 => GatewayError::ServerError { status, message },
        _ => GatewayError::RequestFailed { status, message },
    }
}

/// Prefer the provider's `error.message` over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| patchpilot_domain::truncate(body.trim(), 500))
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

fn from_reqwest(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() || e.is_request() {
        GatewayError::ConnectionError(e.to_string())
    } else if e.is_decode() || e.is_body() {
        GatewayError::InvalidResponse(e.to_string())
    } else {
        GatewayError::Other(e.to_string())
    }
}
