//! Error taxonomy for the request/response layer.
//!
//! Classification happens at construction time: an `Http` error knows whether it
//! is a client (4xx) or server (5xx) failure, and that classification is the sole
//! retry signal used by the executor.

use std::time::Duration;

/// Error raised by the API client and everything built on top of it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
  /// Non-success HTTP response, with whatever the backend put in the error body.
  #[error("HTTP {status}: {message}")]
  Http {
    status: u16,
    message: String,
    /// Application-level error code (e.g. "COURSE_NOT_FOUND").
    code: Option<String>,
    /// Field the error refers to, for validation failures.
    field: Option<String>,
  },

  /// The per-attempt timeout fired. Terminal, never retried.
  #[error("request timed out after {0:?}")]
  Timeout(Duration),

  /// Transport-level failure (connect, DNS, broken stream). Retryable.
  #[error("network error: {0}")]
  Network(String),

  /// Response declared a content type that is neither JSON nor text.
  #[error("unsupported content type: {0:?}")]
  UnsupportedContentType(String),

  /// Success response whose body could not be parsed into the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// The request could not be built in the first place.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// Configuration file missing or malformed.
  #[error("configuration error: {0}")]
  Config(String),
}

impl ApiError {
  /// HTTP error with no application-level code or field.
  pub fn http(status: u16, message: impl Into<String>) -> Self {
    Self::Http {
      status,
      message: message.into(),
      code: None,
      field: None,
    }
  }

  /// The HTTP status, if this error came from a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Application-level error code from the backend, if any.
  pub fn code(&self) -> Option<&str> {
    match self {
      Self::Http { code, .. } => code.as_deref(),
      _ => None,
    }
  }

  pub fn is_client_error(&self) -> bool {
    matches!(self.status(), Some(s) if (400..500).contains(&s))
  }

  pub fn is_server_error(&self) -> bool {
    matches!(self.status(), Some(s) if (500..600).contains(&s))
  }

  /// Whether another attempt is allowed to observe a different outcome.
  ///
  /// Server errors and transport failures are transient; everything else is a
  /// property of the request itself and retrying would only repeat it.
  pub fn is_retryable(&self) -> bool {
    self.is_server_error() || matches!(self, Self::Network(_))
  }
}
