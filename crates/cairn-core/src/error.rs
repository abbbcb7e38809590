//! Error types for `cairn-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown article status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown order field: {0:?}")]
  UnknownOrderField(String),

  #[error("unknown order direction: {0:?}")]
  UnknownDirection(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ErrorCode for Error {
  fn code(&self) -> &str {
    match self {
      Self::UnknownStatus(_)
      | Self::UnknownOrderField(_)
      | Self::UnknownDirection(_) => "invalid-argument",
      Self::Serialization(_) => "internal",
    }
  }
}

/// A backend error that carries the backend's own error code.
///
/// Codes follow the hosted backend's vocabulary: bare codes such as
/// `"permission-denied"`, `"not-found"` or `"unavailable"` for document
/// operations, and `auth/`-prefixed codes such as `"auth/wrong-password"` for
/// identity operations. Client layers map these codes to user-facing
/// messages.
pub trait ErrorCode {
  fn code(&self) -> &str;
}

impl ErrorCode for std::convert::Infallible {
  fn code(&self) -> &str { match *self {} }
}
