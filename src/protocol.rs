//! Wire format: newline-delimited JSON arrays.
//!
//! Inbound: `[method, id, args]`. Outbound: `["READY"]`,
//! `["RESULT", id, value]` or `["ERROR", id, {"name", "message"}]`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, WorkerError};

/// One inbound call, not yet bound to a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub method: String,
    pub id: Value,
    /// Always a JSON array.
    pub args: Value,
}

/// A line that could not be decoded into an [`Envelope`].
#[derive(Debug)]
pub struct EnvelopeError {
    /// Call id, when the line got far enough to carry one.
    pub id: Option<Value>,
    pub error: WorkerError,
}

impl Envelope {
    pub fn new(method: impl Into<String>, id: Value, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            id,
            args: Value::Array(args),
        }
    }

    /// Decode one line of input.
    pub fn parse(line: &str) -> std::result::Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(line).map_err(|e| EnvelopeError {
            id: None,
            error: WorkerError::InvalidEnvelope(e.to_string()),
        })?;

        let Value::Array(mut parts) = value else {
            return Err(EnvelopeError {
                id: None,
                error: WorkerError::InvalidEnvelope("expected a JSON array".to_string()),
            });
        };

        let id = parts.get(1).cloned();
        let invalid = |reason: &str| EnvelopeError {
            id: id.clone(),
            error: WorkerError::InvalidEnvelope(reason.to_string()),
        };

        if parts.len() != 3 {
            return Err(invalid("expected [method, id, args]"));
        }
        let args = parts.pop().unwrap_or(Value::Null);
        let id = parts.pop().unwrap_or(Value::Null);
        let method = match parts.pop() {
            Some(Value::String(method)) => method,
            _ => return Err(invalid("method name must be a string")),
        };
        if !args.is_array() {
            return Err(invalid("args must be an array"));
        }

        Ok(Self { method, id, args })
    }
}

/// Arguments of `openDocumentFromUrl`.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlSource {
    pub url: String,
    pub content_length: u64,
    /// Chunk size hint in KiB.
    pub progressive: u64,
    pub prefetch: bool,
    pub magic: String,
}

/// A call bound to its typed arguments. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    OpenDocumentFromBuffer { buffer: String, magic: String },
    OpenDocumentFromUrl(UrlSource),
    FreeDocument,
    DocumentTitle,
    DocumentOutline,
    DocumentMetadata,
    NeedsPassword,
    AuthenticatePassword { password: String },
    CountPages,
    GetPageSizes { dpi: f32 },
    GetPageWidth { page: i32, dpi: f32 },
    GetPageHeight { page: i32, dpi: f32 },
    GetPageLinks { page: i32, dpi: f32 },
    GetPageText { page: i32, dpi: f32 },
    Search { page: i32, dpi: f32, needle: String },
    GetPageAnnotations { page: i32, dpi: f32 },
    DrawPageAsPng { page: i32, dpi: f32 },
}

fn positional<T: DeserializeOwned>(method: &str, args: &Value) -> Result<T> {
    T::deserialize(args).map_err(|e| WorkerError::InvalidParams {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn no_args(method: &str, args: &Value) -> Result<()> {
    match args.as_array() {
        Some(list) if list.is_empty() => Ok(()),
        _ => Err(WorkerError::InvalidParams {
            method: method.to_string(),
            reason: "takes no arguments".to_string(),
        }),
    }
}

impl Call {
    /// Bind a method name and positional arguments to a typed call.
    pub fn bind(method: &str, args: &Value) -> Result<Self> {
        let call = match method {
            "openDocumentFromBuffer" => {
                let (buffer, magic): (String, String) = positional(method, args)?;
                Self::OpenDocumentFromBuffer { buffer, magic }
            }
            "openDocumentFromUrl" => {
                let (url, content_length, progressive, prefetch, magic): (
                    String,
                    u64,
                    u64,
                    bool,
                    String,
                ) = positional(method, args)?;
                Self::OpenDocumentFromUrl(UrlSource {
                    url,
                    content_length,
                    progressive,
                    prefetch,
                    magic,
                })
            }
            "freeDocument" => no_args(method, args).map(|_| Self::FreeDocument)?,
            "documentTitle" => no_args(method, args).map(|_| Self::DocumentTitle)?,
            "documentOutline" => no_args(method, args).map(|_| Self::DocumentOutline)?,
            "documentMetadata" => no_args(method, args).map(|_| Self::DocumentMetadata)?,
            "needsPassword" => no_args(method, args).map(|_| Self::NeedsPassword)?,
            "authenticatePassword" => {
                let (password,): (String,) = positional(method, args)?;
                Self::AuthenticatePassword { password }
            }
            "countPages" => no_args(method, args).map(|_| Self::CountPages)?,
            "getPageSizes" => {
                let (dpi,): (f32,) = positional(method, args)?;
                Self::GetPageSizes { dpi }
            }
            "getPageWidth" => {
                let (page, dpi) = positional(method, args)?;
                Self::GetPageWidth { page, dpi }
            }
            "getPageHeight" => {
                let (page, dpi) = positional(method, args)?;
                Self::GetPageHeight { page, dpi }
            }
            "getPageLinks" => {
                let (page, dpi) = positional(method, args)?;
                Self::GetPageLinks { page, dpi }
            }
            "getPageText" => {
                let (page, dpi) = positional(method, args)?;
                Self::GetPageText { page, dpi }
            }
            "search" => {
                let (page, dpi, needle) = positional(method, args)?;
                Self::Search { page, dpi, needle }
            }
            "getPageAnnotations" => {
                let (page, dpi) = positional(method, args)?;
                Self::GetPageAnnotations { page, dpi }
            }
            "drawPageAsPNG" => {
                let (page, dpi) = positional(method, args)?;
                Self::DrawPageAsPng { page, dpi }
            }
            other => return Err(WorkerError::UnknownMethod(other.to_string())),
        };
        Ok(call)
    }

    /// Wire name of the call.
    pub fn method(&self) -> &'static str {
        match self {
            Self::OpenDocumentFromBuffer { .. } => "openDocumentFromBuffer",
            Self::OpenDocumentFromUrl(_) => "openDocumentFromUrl",
            Self::FreeDocument => "freeDocument",
            Self::DocumentTitle => "documentTitle",
            Self::DocumentOutline => "documentOutline",
            Self::DocumentMetadata => "documentMetadata",
            Self::NeedsPassword => "needsPassword",
            Self::AuthenticatePassword { .. } => "authenticatePassword",
            Self::CountPages => "countPages",
            Self::GetPageSizes { .. } => "getPageSizes",
            Self::GetPageWidth { .. } => "getPageWidth",
            Self::GetPageHeight { .. } => "getPageHeight",
            Self::GetPageLinks { .. } => "getPageLinks",
            Self::GetPageText { .. } => "getPageText",
            Self::Search { .. } => "search",
            Self::GetPageAnnotations { .. } => "getPageAnnotations",
            Self::DrawPageAsPng { .. } => "drawPageAsPNG",
        }
    }
}

/// Error payload of an `ERROR` reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    pub name: String,
    pub message: String,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ready,
    Result { id: Value, value: Value },
    Error { id: Value, error: ErrorPayload },
}

impl Reply {
    pub fn result(id: Value, value: Value) -> Self {
        Self::Result { id, value }
    }

    pub fn error(id: Value, err: &WorkerError) -> Self {
        Self::Error {
            id,
            error: ErrorPayload {
                name: err.name().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Ready => json!(["READY"]),
            Self::Result { id, value } => json!(["RESULT", id, value]),
            Self::Error { id, error } => json!([
                "ERROR",
                id,
                { "name": error.name, "message": error.message }
            ]),
        }
    }

    /// Encode as one protocol line, newline included.
    pub fn to_line(&self) -> String {
        let mut line = self.to_value().to_string();
        line.push('\n');
        line
    }

    /// Decode a line written by [`Reply::to_line`].
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let parts = value
            .as_array()
            .ok_or_else(|| WorkerError::InvalidEnvelope("expected a JSON array".to_string()))?;
        match (parts.first().and_then(Value::as_str), parts.len()) {
            (Some("READY"), 1) => Ok(Self::Ready),
            (Some("RESULT"), 3) => Ok(Self::Result {
                id: parts[1].clone(),
                value: parts[2].clone(),
            }),
            (Some("ERROR"), 3) => Ok(Self::Error {
                id: parts[1].clone(),
                error: ErrorPayload::deserialize(&parts[2])?,
            }),
            _ => Err(WorkerError::InvalidEnvelope(format!("unrecognised reply: {line}"))),
        }
    }
}
