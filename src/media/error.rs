use thiserror::Error;

/// Why a remote blob could not be retrieved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("server responded with HTTP {0}")]
  Status(u16),

  #[error("no data returned")]
  EmptyPayload,

  #[error("unsupported URL scheme: {0}")]
  UnsupportedScheme(String),

  #[error("failed to read {path}: {message}")]
  Io { path: String, message: String },
}

impl From<reqwest::Error> for FetchError {
  fn from(e: reqwest::Error) -> Self {
    match e.status() {
      Some(status) => FetchError::Status(status.as_u16()),
      None => FetchError::Transport(e.to_string()),
    }
  }
}
