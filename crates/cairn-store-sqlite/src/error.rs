//! Error type for `cairn-store-sqlite`.

use cairn_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cairn_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("{collection} document not found: {id}")]
  NotFound {
    collection: &'static str,
    id:         String,
  },

  #[error("no account for {0}")]
  AccountNotFound(String),

  #[error("email already in use: {0}")]
  EmailAlreadyInUse(String),

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("invalid email: {0:?}")]
  InvalidEmail(String),

  #[error("password must be at least {0} characters")]
  WeakPassword(usize),

  #[error("password hashing error: {0}")]
  PasswordHash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ErrorCode for Error {
  fn code(&self) -> &str {
    match self {
      Self::Core(e) => e.code(),
      Self::Database(_) => "unavailable",
      Self::Json(_) | Self::Uuid(_) | Self::DateParse(_) => "data-loss",
      Self::NotFound { .. } => "not-found",
      Self::AccountNotFound(_) => "auth/user-not-found",
      Self::EmailAlreadyInUse(_) => "auth/email-already-in-use",
      Self::InvalidCredentials => "auth/wrong-password",
      Self::InvalidEmail(_) => "auth/invalid-email",
      Self::WeakPassword(_) => "auth/weak-password",
      Self::PasswordHash(_) => "internal",
    }
  }
}
