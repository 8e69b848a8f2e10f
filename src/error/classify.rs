//! Classification of raw failures into a typed, retry-decidable shape.

use std::collections::HashMap;

use thiserror::Error;

use super::raw::RawFailure;
use super::unified::{ErrorCategory, ErrorCode, RecoverySuggestion};

const UNKNOWN_MESSAGE: &str = "An unknown error occurred";
const AUTHENTICATION_MESSAGE: &str = "Authentication failed. Please check your credentials";
const AUTHORIZATION_MESSAGE: &str = "You do not have permission to perform this action";
const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later";
const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again later";
const MAX_PASSTHROUGH_LEN: usize = 100;

/// Category-tagged view of a failure. Immutable once built.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ClassifiedError {
    category: ErrorCategory,
    code: ErrorCode,
    message: String,
    status_code: Option<u16>,
    resource: Option<String>,
    resource_id: Option<String>,
    request_id: Option<String>,
    details: Option<HashMap<String, serde_json::Value>>,
    #[source]
    cause: RawFailure,
}

impl ClassifiedError {
    fn bare(category: ErrorCategory, code: ErrorCode, message: String, cause: RawFailure) -> Self {
        Self {
            category,
            code,
            message,
            status_code: None,
            resource: None,
            resource_id: None,
            request_id: None,
            details: None,
            cause,
        }
    }

    pub fn category(&self) -> &ErrorCategory {
        &self.category
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn details(&self) -> Option<&HashMap<String, serde_json::Value>> {
        self.details.as_ref()
    }

    /// The failure this classification was built from.
    pub fn cause(&self) -> &RawFailure {
        &self.cause
    }

    pub fn into_cause(self) -> RawFailure {
        self.cause
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        RecoverySuggestion::for_category(&self.category)
    }

    /// Short, non-technical sentence suitable for end users.
    pub fn user_message(&self) -> String {
        user_friendly_message(self)
    }
}

/// Classify any raw failure. Never fails.
pub fn classify(raw: impl Into<RawFailure>) -> ClassifiedError {
    let raw = raw.into();
    match &raw {
        RawFailure::Domain(err) => {
            let message = known_category_message(
                err.category(),
                err.resource(),
                err.resource_id(),
            )
            .unwrap_or_else(|| err.message().to_string());
            let details = (!err.details().is_empty()).then(|| err.details().clone());
            ClassifiedError {
                category: err.category().clone(),
                code: err.code().clone(),
                message,
                status_code: err.status_code(),
                resource: err.resource().map(str::to_string),
                resource_id: err.resource_id().map(str::to_string),
                request_id: err.request_id().map(str::to_string),
                details,
                cause: raw,
            }
        }
        RawFailure::Http(err) => {
            let category = match &err.code {
                Some(code) => ErrorCategory::parse(code.as_str()),
                None => ErrorCategory::Other(err.name.clone()),
            };
            let code = err
                .code
                .as_deref()
                .map(ErrorCode::parse)
                .unwrap_or(ErrorCode::Unknown);
            let message = err.message.clone();
            let status_code = err.status_code;
            let mut classified = ClassifiedError::bare(category, code, message, raw);
            classified.status_code = status_code;
            classified
        }
        RawFailure::Object(obj) => {
            let (category, code) = match &obj.code {
                Some(code) => (ErrorCategory::parse(code.as_str()), ErrorCode::parse(code.as_str())),
                None => (ErrorCategory::Unknown, ErrorCode::Unknown),
            };
            let message = obj.text().unwrap_or(UNKNOWN_MESSAGE).to_string();
            let status_code = obj.status;
            let mut classified = ClassifiedError::bare(category, code, message, raw);
            classified.status_code = status_code;
            classified
        }
        RawFailure::Message(message) => {
            let message = message.clone();
            ClassifiedError::bare(ErrorCategory::Unknown, ErrorCode::Unknown, message, raw)
        }
        RawFailure::Cancelled => ClassifiedError::bare(
            ErrorCategory::Unknown,
            ErrorCode::Cancelled,
            "The operation was cancelled".to_string(),
            raw,
        ),
        RawFailure::Unknown => ClassifiedError::bare(
            ErrorCategory::Unknown,
            ErrorCode::Unknown,
            UNKNOWN_MESSAGE.to_string(),
            raw,
        ),
    }
}

fn known_category_message(
    category: &ErrorCategory,
    resource: Option<&str>,
    resource_id: Option<&str>,
) -> Option<String> {
    match category {
        ErrorCategory::NotFound => Some(not_found_message(resource, resource_id)),
        ErrorCategory::Authentication => Some(AUTHENTICATION_MESSAGE.to_string()),
        ErrorCategory::Authorization => Some(AUTHORIZATION_MESSAGE.to_string()),
        ErrorCategory::LimitExceeded => Some(RATE_LIMIT_MESSAGE.to_string()),
        _ => None,
    }
}

fn not_found_message(resource: Option<&str>, resource_id: Option<&str>) -> String {
    match (resource, resource_id) {
        (Some(resource), Some(id)) => format!("The requested {resource} ({id}) was not found"),
        (Some(resource), None) => format!("The requested {resource} was not found"),
        _ => "The requested resource was not found".to_string(),
    }
}

/// Map a classified error to one short sentence for end users.
///
/// Unknown categories pass the original message through only when it is short,
/// so verbose technical payloads never reach the user.
pub fn user_friendly_message(classified: &ClassifiedError) -> String {
    let fixed = match classified.category() {
        ErrorCategory::Validation => {
            "The request contains invalid data. Please check your input and try again"
        }
        ErrorCategory::NotFound => {
            return not_found_message(classified.resource(), classified.resource_id());
        }
        ErrorCategory::Authentication => AUTHENTICATION_MESSAGE,
        ErrorCategory::Authorization => AUTHORIZATION_MESSAGE,
        ErrorCategory::Conflict => "The operation conflicts with the current state of the resource",
        ErrorCategory::LimitExceeded => RATE_LIMIT_MESSAGE,
        ErrorCategory::Timeout => "The request timed out. Please try again",
        ErrorCategory::Network => {
            "A network error occurred. Please check your connection and try again"
        }
        ErrorCategory::Unprocessable => "The request could not be processed",
        ErrorCategory::Internal => "An internal server error occurred. Please try again later",
        ErrorCategory::Unknown | ErrorCategory::Other(_) => {
            let message = classified.message();
            if message.chars().count() <= MAX_PASSTHROUGH_LEN {
                return message.to_string();
            }
            UNEXPECTED_MESSAGE
        }
    };
    fixed.to_string()
}
