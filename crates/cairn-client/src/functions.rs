//! HTTP client for the callable role functions.
//!
//! Requests carry `{"data": ...}` and the caller's bearer token. Responses
//! are either `{"result": ...}` or `{"error": {"status", "message"}}`; the
//! latter becomes [`CallableError::Function`].

use cairn_core::ErrorCode;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CallableError {
  #[error("invalid functions URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The function ran and refused or failed.
  #[error("{status}: {message}")]
  Function { code: String, status: String, message: String },

  #[error("malformed response: {0}")]
  Malformed(String),
}

impl CallableError {
  fn function(status: String, message: String) -> Self {
    Self::Function { code: status.to_lowercase().replace('_', "-"), status, message }
  }
}

impl ErrorCode for CallableError {
  fn code(&self) -> &str {
    match self {
      Self::InvalidUrl(_) => "invalid-argument",
      Self::Transport(_) => "unavailable",
      Self::Function { code, .. } => code,
      Self::Malformed(_) => "internal",
    }
  }
}

#[derive(Serialize)]
struct CallRequest<'a, T> {
  data: &'a T,
}

#[derive(Deserialize)]
struct CallResponse<T> {
  result: Option<T>,
  error:  Option<CallFailure>,
}

#[derive(Deserialize)]
struct CallFailure {
  status:  String,
  message: String,
}

#[derive(Serialize)]
struct RoleRequest<'a> {
  uid: &'a str,
}

/// Confirmation returned by the role functions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleResponse {
  pub message: String,
}

/// Client for the callable functions service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FunctionsClient {
  client: Client,
  base:   Url,
}

impl FunctionsClient {
  pub fn new(base_url: &str) -> Result<Self, CallableError> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }
    let client = Client::builder().build()?;
    Ok(Self { client, base })
  }

  /// `grantAdminRole({uid})`
  pub async fn grant_admin_role(
    &self,
    token: Option<&str>,
    uid: &str,
  ) -> Result<RoleResponse, CallableError> {
    self.call("grantAdminRole", token, &RoleRequest { uid }).await
  }

  /// `revokeAdminRole({uid})`
  pub async fn revoke_admin_role(
    &self,
    token: Option<&str>,
    uid: &str,
  ) -> Result<RoleResponse, CallableError> {
    self.call("revokeAdminRole", token, &RoleRequest { uid }).await
  }

  /// Invoke the callable `name` with `data`, authenticated by `token` if
  /// given.
  pub async fn call<T, R>(
    &self,
    name: &str,
    token: Option<&str>,
    data: &T,
  ) -> Result<R, CallableError>
  where
    T: Serialize,
    R: DeserializeOwned,
  {
    let url = self.base.join(name)?;
    let mut request = self.client.post(url).json(&CallRequest { data });
    if let Some(token) = token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: CallResponse<R> = response
      .json()
      .await
      .map_err(|e| CallableError::Malformed(format!("{name} ({status}): {e}")))?;

    match (body.result, body.error) {
      (_, Some(failure)) => {
        tracing::debug!(function = name, status = %failure.status, "callable failed");
        Err(CallableError::function(failure.status, failure.message))
      }
      (Some(result), None) if status.is_success() => Ok(result),
      _ => Err(CallableError::Malformed(format!("{name} ({status}): no result"))),
    }
  }
}
