//! Bearer-token caller extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use cairn_core::{
  auth::{AuthService, AuthUser},
  store::DocumentStore,
};

use crate::{AppState, error::FunctionError};

/// The verified caller of a function; `None` for anonymous requests.
///
/// A request without an `Authorization` header is anonymous. A header that
/// is present but malformed, or whose token doesn't resolve to a session, is
/// rejected as `UNAUTHENTICATED`.
pub struct Caller(pub Option<AuthUser>);

/// The bearer token in `headers`, `Ok(None)` when there is no
/// `Authorization` header at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, FunctionError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(Some)
    .ok_or_else(|| FunctionError::Unauthenticated("Malformed authorization header".into()))
}

impl<A, S> FromRequestParts<AppState<A, S>> for Caller
where
  A: AuthService + 'static,
  S: DocumentStore + 'static,
{
  type Rejection = FunctionError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<A, S>,
  ) -> Result<Self, Self::Rejection> {
    let Some(token) = bearer_token(&parts.headers)? else {
      return Ok(Caller(None));
    };
    match state.auth.verify_token(token).await {
      Ok(Some(user)) => Ok(Caller(Some(user))),
      Ok(None) => Err(FunctionError::Unauthenticated("Invalid or expired session token".into())),
      Err(e) => {
        tracing::error!(error = %e, "token verification failed");
        Err(FunctionError::Internal(format!("Token verification failed: {e}")))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
    headers
  }

  #[test]
  fn missing_header_is_anonymous() {
    assert_eq!(bearer_token(&HeaderMap::new()), Ok(None));
  }

  #[test]
  fn bearer_token_is_extracted() {
    assert_eq!(bearer_token(&headers("Bearer abc")), Ok(Some("abc")));
  }

  #[test]
  fn other_schemes_are_unauthenticated() {
    for value in ["Basic dXNlcjpwYXNz", "Bearer ", "abc"] {
      assert!(matches!(
        bearer_token(&headers(value)),
        Err(FunctionError::Unauthenticated(_))
      ));
    }
  }
}
