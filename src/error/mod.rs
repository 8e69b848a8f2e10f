//! Error types for the ledger client.

pub mod classify;
pub mod raw;
pub mod transaction;
pub mod unified;

pub use classify::{classify, user_friendly_message, ClassifiedError};
pub use raw::{HttpLikeError, PlainObjectError, RawFailure};
pub use transaction::{categorize_transaction_error, TransactionErrorCategory};
pub use unified::{ErrorCategory, ErrorCode, RecoverySuggestion};

use std::collections::HashMap;

use thiserror::Error;

/// Typed failure reported by the ledger service.
///
/// This is the "domain" error shape: it already carries a category and code,
/// so classification copies its fields verbatim. Only domain errors are
/// retried by the default retry predicate.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct LedgerError {
    category: ErrorCategory,
    code: ErrorCode,
    message: String,
    status_code: Option<u16>,
    resource: Option<String>,
    resource_id: Option<String>,
    request_id: Option<String>,
    details: HashMap<String, serde_json::Value>,
}

impl LedgerError {
    pub fn new(category: ErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            status_code: None,
            resource: None,
            resource_id: None,
            request_id: None,
            details: HashMap::new(),
        }
    }

    /// Create an error whose category and code are derived from an HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCategory::from_status(status),
            ErrorCode::from_status(status),
            message,
        )
        .with_status_code(status)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, ErrorCode::InvalidInput, message).with_status_code(400)
    }

    pub fn not_found(resource: impl Into<String>, resource_id: impl Into<String>) -> Self {
        let resource = resource.into();
        let resource_id = resource_id.into();
        Self::new(
            ErrorCategory::NotFound,
            ErrorCode::NotFound,
            format!("{resource} {resource_id} not found"),
        )
        .with_status_code(404)
        .with_resource(resource, resource_id)
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Conflict, code, message).with_status_code(409)
    }

    pub fn unprocessable(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unprocessable, code, message).with_status_code(422)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, ErrorCode::InternalError, message).with_status_code(500)
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_resource(
        mut self,
        resource: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource = Some(resource.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
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

    pub fn details(&self) -> &HashMap<String, serde_json::Value> {
        &self.details
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        RecoverySuggestion::for_category(&self.category)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LedgerError>;
