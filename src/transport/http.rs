//! HTTP error adaptation: turn ledger service responses into [`LedgerError`]s.

use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::error::{ErrorCategory, ErrorCode, LedgerError, RawFailure};

/// Header carrying the service-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Error body returned by the ledger service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: Option<String>,
    title: Option<String>,
    message: Option<String>,
    error: Option<String>,
    entity_type: Option<String>,
    entity_id: Option<String>,
    retry_after: Option<f64>,
    #[serde(default)]
    fields: Option<serde_json::Value>,
}

/// Build a domain error from a status code and raw response body.
///
/// JSON bodies contribute `code`, `message`/`title`/`error`, the entity the
/// error refers to, `retryAfter` (seconds, stored in details as `retry_after_ms`)
/// and field-level validation details. Non-JSON bodies become the message.
pub fn status_to_error(status: u16, body: &str) -> LedgerError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let Some(parsed) = parsed else {
        let message = if body.trim().is_empty() {
            format!("Request failed with status {status}")
        } else {
            body.to_string()
        };
        return LedgerError::from_status(status, message);
    };

    let message = parsed
        .message
        .or(parsed.error)
        .or(parsed.title)
        .unwrap_or_else(|| format!("Request failed with status {status}"));
    let code = parsed
        .code
        .as_deref()
        .map(ErrorCode::parse)
        .unwrap_or_else(|| ErrorCode::from_status(status));

    let mut err = LedgerError::new(ErrorCategory::from_status(status), code, message)
        .with_status_code(status);
    if let Some(resource) = parsed.entity_type {
        err = err.with_resource(resource, parsed.entity_id.unwrap_or_default());
    }
    if let Some(seconds) = parsed.retry_after {
        err = err.with_detail("retry_after_ms", serde_json::json!((seconds * 1000.0) as u64));
    }
    if let Some(fields) = parsed.fields {
        err = err.with_detail("fields", fields);
    }
    err
}

/// Like [`status_to_error`], also picking up the request id header.
pub fn response_parts_to_error(status: u16, headers: &HeaderMap, body: &str) -> LedgerError {
    let err = status_to_error(status, body);
    match headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(request_id) => err.with_request_id(request_id),
        None => err,
    }
}

/// Check a response: pass successes through, convert failures.
///
/// A body that cannot be read is reported as a transport failure rather than
/// a domain error, so it is not retried by the default predicate.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RawFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await?;
    Err(response_parts_to_error(status.as_u16(), &headers, &body).into())
}

/// Decode a successful JSON response, or convert the failure.
pub async fn json_or_error<T>(response: reqwest::Response) -> Result<T, RawFailure>
where
    T: serde::de::DeserializeOwned,
{
    let response = check_response(response).await?;
    Ok(response.json::<T>().await?)
}
