//! Callable function errors and their wire envelope.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use cairn_core::ErrorCode;
use serde_json::json;
use thiserror::Error;

/// An error a callable function reports to its caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FunctionError {
  #[error("{0}")]
  PermissionDenied(String),

  #[error("{0}")]
  InvalidArgument(String),

  #[error("{0}")]
  FailedPrecondition(String),

  /// A bearer token was sent but doesn't resolve to a session.
  #[error("{0}")]
  Unauthenticated(String),

  #[error("{0}")]
  Internal(String),
}

pub type Result<T, E = FunctionError> = std::result::Result<T, E>;

impl FunctionError {
  /// Canonical status name used in the error envelope.
  pub fn status(&self) -> &'static str {
    match self {
      Self::PermissionDenied(_) => "PERMISSION_DENIED",
      Self::InvalidArgument(_) => "INVALID_ARGUMENT",
      Self::FailedPrecondition(_) => "FAILED_PRECONDITION",
      Self::Unauthenticated(_) => "UNAUTHENTICATED",
      Self::Internal(_) => "INTERNAL",
    }
  }

  fn http_status(&self) -> StatusCode {
    match self {
      Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
      Self::InvalidArgument(_) | Self::FailedPrecondition(_) => StatusCode::BAD_REQUEST,
      Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl ErrorCode for FunctionError {
  fn code(&self) -> &str {
    match self {
      Self::PermissionDenied(_) => "permission-denied",
      Self::InvalidArgument(_) => "invalid-argument",
      Self::FailedPrecondition(_) => "failed-precondition",
      Self::Unauthenticated(_) => "unauthenticated",
      Self::Internal(_) => "internal",
    }
  }
}

impl IntoResponse for FunctionError {
  fn into_response(self) -> Response {
    let body = json!({ "error": { "status": self.status(), "message": self.to_string() } });
    (self.http_status(), Json(body)).into_response()
  }
}
