//! Error types for the MuPDF view worker.

use thiserror::Error;

/// Errors that can occur while servicing a call.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A document-scoped call arrived while no document is open.
    #[error("No document is open")]
    NoDocumentOpen,

    /// Invalid page number (out of bounds).
    #[error("Invalid page number: {page} (document has {total} pages, valid range: 1-{total})")]
    InvalidPageNumber { page: i32, total: i32 },

    /// The bytes needed to complete the call have not arrived yet.
    #[error("Document data not yet available: {0}")]
    TryLater(String),

    /// No handler is registered under this method name.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Positional arguments did not match the method's signature.
    #[error("Invalid arguments for {method}: {reason}")]
    InvalidParams { method: String, reason: String },

    /// The inbound message was not a `[method, id, args]` triple.
    #[error("Invalid call envelope: {0}")]
    InvalidEnvelope(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// IO error on the transport.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// MuPDF library error.
    #[error("MuPDF error: {0}")]
    MupdfError(#[from] mupdf::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Remote byte-range fetch failed.
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// Internal error (unexpected state).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Create an internal error with a message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Categorical name carried in `ERROR` replies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoDocumentOpen => "NoDocumentOpen",
            Self::InvalidPageNumber { .. } => "InvalidPageNumber",
            Self::TryLater(_) => "TryLaterError",
            Self::UnknownMethod(_) => "UnknownMethod",
            Self::InvalidParams { .. } => "InvalidParams",
            Self::InvalidEnvelope(_) => "InvalidEnvelope",
            Self::Base64Error(_) => "Base64Error",
            Self::IoError(_) => "IoError",
            Self::MupdfError(_) => "MupdfError",
            Self::JsonError(_) => "JsonError",
            Self::FetchError(_) => "FetchError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Whether the call should be parked and retried once more data arrives.
    pub fn is_try_later(&self) -> bool {
        matches!(self, Self::TryLater(_))
    }
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_later_is_classified() {
        let err = WorkerError::TryLater("https://example.com/a.pdf".to_string());
        assert!(err.is_try_later());
        assert_eq!(err.name(), "TryLaterError");
        assert!(!WorkerError::NoDocumentOpen.is_try_later());
    }

    #[test]
    fn test_invalid_page_message() {
        let err = WorkerError::InvalidPageNumber { page: 7, total: 3 };
        assert_eq!(err.name(), "InvalidPageNumber");
        assert!(err.to_string().contains("1-3"));
    }
}
