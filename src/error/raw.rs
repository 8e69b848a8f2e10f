//! Raw failure shapes accepted at the transport boundary.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::LedgerError;

type BoxedSource = Arc<dyn StdError + Send + Sync>;

/// Any failure an operation can produce, before classification.
///
/// Every operation error is converted into one of these shapes so that
/// classification is an exhaustive match rather than field probing.
#[derive(Error, Debug, Clone)]
pub enum RawFailure {
    /// Typed failure from the ledger service.
    #[error(transparent)]
    Domain(#[from] LedgerError),

    /// Generic error value with optional status and code attached.
    #[error(transparent)]
    Http(#[from] HttpLikeError),

    /// Loosely structured error object, usually an undecoded JSON body.
    #[error("{}", .0.text().unwrap_or("An unknown error occurred"))]
    Object(PlainObjectError),

    /// Bare message.
    #[error("{0}")]
    Message(String),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    #[error("An unknown error occurred")]
    Unknown,
}

impl RawFailure {
    /// Build a generic error with the given type name.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http(HttpLikeError::new(name, message))
    }

    /// Adapt an arbitrary JSON value.
    ///
    /// Objects with a string `error` or `message` field become [`RawFailure::Object`],
    /// strings become [`RawFailure::Message`], everything else is unknown.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(message) => Self::Message(message),
            serde_json::Value::Object(map) => {
                let field = |key: &str| map.get(key).and_then(|v| v.as_str()).map(str::to_string);
                let status = |key: &str| {
                    map.get(key)
                        .and_then(|v| v.as_u64())
                        .and_then(|v| u16::try_from(v).ok())
                };
                let object = PlainObjectError {
                    message: field("message"),
                    error: field("error"),
                    status: status("status").or_else(|| status("statusCode")),
                    code: field("code"),
                };
                if object.text().is_some() {
                    Self::Object(object)
                } else {
                    Self::Unknown
                }
            }
            _ => Self::Unknown,
        }
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Status code carried by the failure, if any shape provides one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Domain(err) => err.status_code(),
            Self::Http(err) => err.status_code,
            Self::Object(obj) => obj.status,
            Self::Message(_) | Self::Cancelled | Self::Unknown => None,
        }
    }

    /// Message as originally reported, before any human-readable override.
    pub fn original_message(&self) -> String {
        match self {
            Self::Domain(err) => err.message().to_string(),
            Self::Http(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<serde_json::Value> for RawFailure {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        let name = if err.is_timeout() {
            "TimeoutError"
        } else if err.is_connect() {
            "ConnectionError"
        } else if err.is_decode() {
            "DecodeError"
        } else {
            "NetworkError"
        };
        let mut http = HttpLikeError::new(name, err.to_string());
        http.status_code = err.status().map(|s| s.as_u16());
        Self::Http(http.with_source(err))
    }
}

/// Generic error value, optionally decorated with a status code and code.
#[derive(Error, Clone)]
#[error("{message}")]
pub struct HttpLikeError {
    /// Type name of the error, used as the category when no code is attached.
    pub name: String,
    pub message: String,
    pub status_code: Option<u16>,
    pub code: Option<String>,
    #[source]
    source: Option<BoxedSource>,
}

impl HttpLikeError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status_code: None,
            code: None,
            source: None,
        }
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl fmt::Debug for HttpLikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLikeError")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("status_code", &self.status_code)
            .field("code", &self.code)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

/// Plain error object with optional `message`, `error`, `status` and `code` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainObjectError {
    pub message: Option<String>,
    pub error: Option<String>,
    pub status: Option<u16>,
    pub code: Option<String>,
}

impl PlainObjectError {
    /// The `error` field wins over `message`.
    pub fn text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}
