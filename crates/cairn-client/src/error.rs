//! Structured application errors and the error log.
//!
//! Backend errors arrive with the backend's own code (see
//! [`cairn_core::ErrorCode`]). [`AppError`] keeps that code, adds a
//! user-facing message and a severity, and is cheap to clone so it can live
//! in reactive state.

use std::{
  collections::VecDeque,
  fmt,
  sync::{Mutex, PoisonError},
};

use cairn_core::ErrorCode;
use serde::Serialize;
use thiserror::Error;

/// Fallback user message when neither the caller nor the code table has one.
pub const DEFAULT_USER_MESSAGE: &str = "The operation failed, please try again later";

/// How many reported errors [`ErrorLog`] keeps.
pub const ERROR_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    })
  }
}

/// A structured, cloneable error record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("[{code}] {message}")]
pub struct AppError {
  /// Backend code (`"permission-denied"`, `"auth/wrong-password"`) or an
  /// application code (`"FETCH_ARTICLES_ERROR"`, `"UNKNOWN_ERROR"`).
  pub code:         String,
  /// Diagnostic message, usually the source error's `Display`.
  pub message:      String,
  /// What a user should be shown.
  pub user_message: String,
  /// Where the error was reported from.
  pub context:      Option<String>,
  pub severity:     Severity,
}

impl AppError {
  pub fn new(
    code: impl Into<String>,
    message: impl Into<String>,
    user_message: impl Into<String>,
  ) -> Self {
    let code = code.into();
    Self {
      severity: severity_for(&code),
      code,
      message: message.into(),
      user_message: user_message.into(),
      context: None,
    }
  }

  /// Build from a backend error, mapping its code to a user message.
  ///
  /// A known code's message wins over `custom_message`; the custom message is
  /// the fallback for codes the table doesn't know.
  pub fn from_backend<E>(err: &E, custom_message: Option<&str>) -> Self
  where
    E: std::error::Error + ErrorCode + ?Sized,
  {
    let code = err.code().to_owned();
    let user_message = user_message_for(&code)
      .or(custom_message)
      .unwrap_or(DEFAULT_USER_MESSAGE)
      .to_owned();
    Self {
      severity: severity_for(&code),
      message: err.to_string(),
      user_message,
      code,
      context: None,
    }
  }

  pub fn with_context(mut self, context: impl Into<String>) -> Self {
    self.context = Some(context.into());
    self
  }
}

/// User-facing message for a backend code.
pub fn user_message_for(code: &str) -> Option<&'static str> {
  Some(match code {
    // Auth
    "auth/user-not-found" => "No account exists for this email address",
    "auth/wrong-password" => "Incorrect password",
    "auth/invalid-email" => "The email address is not valid",
    "auth/user-disabled" => "This account has been disabled",
    "auth/too-many-requests" => "Too many attempts, please try again later",
    "auth/weak-password" => "The password is too weak, use at least 6 characters",
    "auth/email-already-in-use" => "This email address is already in use",
    "auth/requires-recent-login" => "Please sign in again and retry",
    "auth/network-request-failed" => "Network request failed, check your connection",
    // Document store and functions
    "permission-denied" => "You do not have permission to do this",
    "not-found" => "The requested resource was not found",
    "already-exists" => "The resource already exists",
    "resource-exhausted" => "Too many requests, please try again later",
    "failed-precondition" => "The operation's preconditions were not met",
    "invalid-argument" => "The request was not valid",
    "unavailable" => "The service is temporarily unavailable, please try again later",
    "unauthenticated" => "You need to sign in to do this",
    // General
    "NETWORK_ERROR" => "Network request failed, check your connection",
    "TIMEOUT_ERROR" => "The request timed out, please try again later",
    "VALIDATION_ERROR" => "The submitted data is not valid",
    "SERVER_ERROR" => "Server error, please try again later",
    _ => return None,
  })
}

/// Severity for a code; unknown codes are [`Severity::Low`].
pub fn severity_for(code: &str) -> Severity {
  match code {
    "auth/network-request-failed" | "unavailable" | "resource-exhausted" => {
      Severity::Critical
    }
    "permission-denied" | "unauthenticated" | "auth/user-disabled" => Severity::High,
    "auth/wrong-password" | "auth/user-not-found" | "not-found" => Severity::Medium,
    _ => Severity::Low,
  }
}

// ─── ErrorLog ────────────────────────────────────────────────────────────────

/// A bounded history of reported errors, oldest first.
#[derive(Debug)]
pub struct ErrorLog {
  capacity: usize,
  entries:  Mutex<VecDeque<AppError>>,
}

impl Default for ErrorLog {
  fn default() -> Self { Self::with_capacity(ERROR_LOG_CAPACITY) }
}

impl ErrorLog {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) }
  }

  /// Log `error` at a level matching its severity and append it to the
  /// history, evicting the oldest entry when full.
  pub fn report(&self, error: AppError) -> AppError {
    let context = error.context.as_deref().unwrap_or("app");
    match error.severity {
      Severity::Critical | Severity::High => tracing::error!(
        code = %error.code, severity = %error.severity, context, "{}", error.message
      ),
      Severity::Medium => tracing::warn!(
        code = %error.code, context, "{}", error.message
      ),
      Severity::Low => tracing::info!(
        code = %error.code, context, "{}", error.message
      ),
    }

    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.push_back(error.clone());
    while entries.len() > self.capacity {
      entries.pop_front();
    }
    error
  }

  pub fn entries(&self) -> Vec<AppError> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
  }

  pub fn last(&self) -> Option<AppError> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).back().cloned()
  }

  pub fn by_severity(&self, severity: Severity) -> Vec<AppError> {
    self
      .entries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .filter(|e| e.severity == severity)
      .cloned()
      .collect()
  }

  pub fn clear(&self) {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("backend said {0}")]
  struct Backend(&'static str);

  impl ErrorCode for Backend {
    fn code(&self) -> &str { self.0 }
  }

  #[test]
  fn known_code_maps_message_and_severity() {
    let e = AppError::from_backend(&Backend("permission-denied"), Some("custom"));
    assert_eq!(e.user_message, "You do not have permission to do this");
    assert_eq!(e.severity, Severity::High);
    assert_eq!(e.message, "backend said permission-denied");
  }

  #[test]
  fn unknown_code_falls_back_to_custom_then_default() {
    let custom = AppError::from_backend(&Backend("weird"), Some("Could not save"));
    assert_eq!(custom.user_message, "Could not save");
    assert_eq!(custom.severity, Severity::Low);

    let default = AppError::from_backend(&Backend("weird"), None);
    assert_eq!(default.user_message, DEFAULT_USER_MESSAGE);
  }

  #[test]
  fn log_is_bounded_and_filterable() {
    let log = ErrorLog::with_capacity(3);
    for code in ["a", "unavailable", "b", "not-found"] {
      log.report(AppError::new(code, "m", "u"));
    }
    let codes: Vec<_> = log.entries().into_iter().map(|e| e.code).collect();
    assert_eq!(codes, ["unavailable", "b", "not-found"]);
    assert_eq!(log.last().unwrap().code, "not-found");
    assert_eq!(log.by_severity(Severity::Critical).len(), 1);

    log.clear();
    assert!(log.entries().is_empty());
  }
}
