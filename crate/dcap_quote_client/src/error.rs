use thiserror::Error;

/// Reason why a report data value was rejected before any request was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MalformedHex,
    WrongLength,
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationErrorKind::MalformedHex => write!(f, "malformed hex"),
            ValidationErrorKind::WrongLength => write!(f, "wrong length"),
        }
    }
}

/// Stage of the HTTP exchange that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectFailed,
    Timeout,
    TlsFailed,
    BodyRead,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TransportErrorKind::ConnectFailed => write!(f, "connect failed"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::TlsFailed => write!(f, "tls failed"),
            TransportErrorKind::BodyRead => write!(f, "body read failed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("ValidationError ({kind}): {message}")]
    ValidationError {
        kind: ValidationErrorKind,
        message: String,
    },
    #[error("TransportError ({kind}): {message}")]
    TransportError {
        kind: TransportErrorKind,
        message: String,
    },
    #[error("RemoteError: HTTP status code {status}, body: {body_excerpt}")]
    RemoteError { status: u16, body_excerpt: String },
    #[error("EmptyResponseError: no quote in response body")]
    EmptyResponseError,
    #[error("OversizedResponseError: response body exceeds {limit} bytes")]
    OversizedResponseError { limit: u64 },
    #[error("URLError: {0}")]
    URLError(String),
    #[error("ConfigError: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Error::ValidationError {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Error::TransportError {
            kind,
            message: message.into(),
        }
    }
}
