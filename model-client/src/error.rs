//! Error types for model endpoint calls

use thiserror::Error;

/// Result type for model client operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised at the model service boundary
#[derive(Error, Debug)]
pub enum ModelError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The call exceeded its timeout budget
    #[error("{service} call timed out after {seconds}s")]
    Timeout { service: &'static str, seconds: u64 },

    /// Response body could not be decoded
    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// Response decoded but contained nothing usable
    #[error("{service} returned an empty response")]
    EmptyResponse { service: &'static str },

    /// Response decoded into a shape the caller cannot use
    #[error("Unexpected {service} response: {message}")]
    UnexpectedShape {
        service: &'static str,
        message: String,
    },

    /// Client could not be constructed
    #[error("Model client configuration error: {0}")]
    Config(String),
}

impl ModelError {
    /// Classify a reqwest error, separating timeouts from transport failures
    pub fn from_reqwest(service: &'static str, seconds: u64, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ModelError::Timeout { service, seconds }
        } else {
            ModelError::Http { service, source }
        }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        ModelError::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn unexpected(service: &'static str, message: impl Into<String>) -> Self {
        ModelError::UnexpectedShape {
            service,
            message: message.into(),
        }
    }

    /// True for failures worth a retry (timeouts, transport errors, 5xx, 429)
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Http { .. } | ModelError::Timeout { .. } => true,
            ModelError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
