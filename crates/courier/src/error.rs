//! Error types for the request helpers

use thiserror::Error;

/// Errors surfaced by every request helper operation.
///
/// The set is closed: configuration problems, rejected call parameters,
/// transport failures and responses that break the envelope contract.
/// None of them is retried by this crate.
#[derive(Error, Debug, Clone)]
pub enum CourierError {
    /// Invalid configuration or timeout value
    #[error("{0}")]
    Config(String),

    /// Invalid per-call parameters; raised before any network I/O
    #[error("{0}")]
    Validation(String),

    /// Network failure, timeout or DNS failure reported by the transport
    #[error("Error happened: {message}")]
    Transport {
        message: String,
        kind: TransportErrorKind,
        meta: RequestMeta,
    },

    /// The remote service answered with a body that breaks the envelope contract
    #[error("{message}")]
    InvalidResponseFormat {
        message: String,
        details: InvalidResponseDetails,
    },
}

/// Result type for request helper operations
pub type CourierResult<T> = Result<T, CourierError>;

/// Call metadata attached to transport errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// URL the call was issued against
    pub url: String,
    /// Remote address, if the transport resolved one before failing
    pub remote_address: Option<String>,
}

/// Diagnostic payload attached to envelope violations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidResponseDetails {
    pub status_code: u16,
    pub request_uri: String,
    /// Response body as text, truncated to [`MAX_RESPONSE_BODY_SIZE`] characters
    pub response_body: String,
}

/// Upper bound on the body text kept in [`InvalidResponseDetails`]
pub const MAX_RESPONSE_BODY_SIZE: usize = 8192;

impl InvalidResponseDetails {
    pub fn new(status_code: u16, request_uri: impl Into<String>, body_text: &str) -> Self {
        Self {
            status_code,
            request_uri: request_uri.into(),
            response_body: truncate_body(body_text),
        }
    }
}

fn truncate_body(text: &str) -> String {
    match text.char_indices().nth(MAX_RESPONSE_BODY_SIZE) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Transport failure flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection failed (DNS, TCP, TLS)
    Connect,
    /// The per-call timeout elapsed
    Timeout,
    /// Anything else the transport reported
    Other,
}

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierErrorCategory {
    Config,
    Validation,
    Connection,
    Timeout,
    Transport,
    Response,
}

impl CourierError {
    pub(crate) fn transport(
        message: impl Into<String>,
        kind: TransportErrorKind,
        meta: RequestMeta,
    ) -> Self {
        CourierError::Transport {
            message: message.into(),
            kind,
            meta,
        }
    }

    pub(crate) fn invalid_response(
        message: impl Into<String>,
        details: InvalidResponseDetails,
    ) -> Self {
        CourierError::InvalidResponseFormat {
            message: message.into(),
            details,
        }
    }

    /// Categorize the error for reporting
    pub fn category(&self) -> CourierErrorCategory {
        match self {
            CourierError::Config(_) => CourierErrorCategory::Config,
            CourierError::Validation(_) => CourierErrorCategory::Validation,
            CourierError::Transport { kind, .. } => match kind {
                TransportErrorKind::Connect => CourierErrorCategory::Connection,
                TransportErrorKind::Timeout => CourierErrorCategory::Timeout,
                TransportErrorKind::Other => CourierErrorCategory::Transport,
            },
            CourierError::InvalidResponseFormat { .. } => CourierErrorCategory::Response,
        }
    }

    /// Returns true if the transport gave up because the timeout elapsed
    pub fn is_timeout(&self) -> bool {
        self.category() == CourierErrorCategory::Timeout
    }

    /// Sanitize error message (remove sensitive info like credentials, internal IPs)
    pub fn sanitized_message(&self) -> String {
        let msg = self.to_string();
        sanitize_error_message(&msg)
    }
}

/// Sanitize error messages by removing sensitive information
fn sanitize_error_message(msg: &str) -> String {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static URL_CREDS_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"https?://[^@:/\s]+:[^@\s]+@").expect("valid regex"));
    static INTERNAL_IP_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b(10\.|172\.(1[6-9]|2[0-9]|3[01])\.|192\.168\.)\d+\.\d+\b")
            .expect("valid regex")
    });

    let sanitized = URL_CREDS_RE.replace_all(msg, "https://[REDACTED]@");
    let sanitized = INTERNAL_IP_RE.replace_all(&sanitized, "[INTERNAL_IP]");

    sanitized.to_string()
}
