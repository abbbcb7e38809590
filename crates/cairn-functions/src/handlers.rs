//! Callable endpoints.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/grantAdminRole`  | `{"data":{"uid":"..."}}` |
//! | `POST` | `/revokeAdminRole` | `{"data":{"uid":"..."}}` |
//!
//! Success is `200 {"result":{"message":"..."}}`; failures use the error
//! envelope of [`FunctionError`].

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use cairn_core::{
  auth::{AuthService, AuthUser},
  store::DocumentStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::Caller,
  error::{FunctionError, Result},
  roles::{RoleChange, require_admin},
};

#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
  pub data: T,
}

#[derive(Debug, Serialize)]
pub struct CallableResponse<T> {
  pub result: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleArgs {
  #[serde(default)]
  pub uid: String,
}

/// Unwrap the request body. A malformed body is `INVALID_ARGUMENT`, but only
/// once the caller has passed the permission check.
fn role_args(
  caller: Option<&AuthUser>,
  body: std::result::Result<Json<CallableRequest<RoleArgs>>, JsonRejection>,
) -> Result<RoleArgs> {
  match body {
    Ok(Json(request)) => Ok(request.data),
    Err(rejection) => {
      require_admin(caller)?;
      Err(FunctionError::InvalidArgument(format!("Bad request body: {rejection}")))
    }
  }
}

/// `POST /grantAdminRole`
pub async fn grant_admin_role<A, S>(
  State(state): State<AppState<A, S>>,
  Caller(caller): Caller,
  body: std::result::Result<Json<CallableRequest<RoleArgs>>, JsonRejection>,
) -> Result<Json<CallableResponse<RoleChange>>>
where
  A: AuthService + 'static,
  S: DocumentStore + 'static,
{
  let caller = caller.as_ref();
  let args = role_args(caller, body)?;
  let result = state.roles.grant_admin_role(caller, &args.uid).await?;
  Ok(Json(CallableResponse { result }))
}

/// `POST /revokeAdminRole`
pub async fn revoke_admin_role<A, S>(
  State(state): State<AppState<A, S>>,
  Caller(caller): Caller,
  body: std::result::Result<Json<CallableRequest<RoleArgs>>, JsonRejection>,
) -> Result<Json<CallableResponse<RoleChange>>>
where
  A: AuthService + 'static,
  S: DocumentStore + 'static,
{
  let caller = caller.as_ref();
  let args = role_args(caller, body)?;
  let result = state.roles.revoke_admin_role(caller, &args.uid).await?;
  Ok(Json(CallableResponse { result }))
}
