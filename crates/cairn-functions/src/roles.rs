//! Admin role management.
//!
//! The `admin` custom claim is the authority; the `isAdmin` field of the
//! `users` profile mirrors it for display. Every change writes the claim
//! first and the profile second. The two writes are not atomic: if the
//! profile write fails the claim has already changed and the call reports
//! `internal`.

use std::sync::Arc;

use cairn_core::{
  auth::{AuthService, AuthUser, CustomClaims},
  store::DocumentStore,
  user::UserPatch,
};
use serde::{Deserialize, Serialize};

use crate::error::{FunctionError, Result};

/// Confirmation returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChange {
  pub message: String,
}

pub struct RoleService<A, S> {
  auth:  Arc<A>,
  store: Arc<S>,
}

impl<A, S> Clone for RoleService<A, S> {
  fn clone(&self) -> Self {
    Self { auth: Arc::clone(&self.auth), store: Arc::clone(&self.store) }
  }
}

impl<A: AuthService, S: DocumentStore> RoleService<A, S> {
  pub fn new(auth: Arc<A>, store: Arc<S>) -> Self { Self { auth, store } }

  /// `grantAdminRole`: make `uid` an admin. The caller must be one.
  pub async fn grant_admin_role(
    &self,
    caller: Option<&AuthUser>,
    uid: &str,
  ) -> Result<RoleChange> {
    require_admin(caller)?;
    let uid = require_uid(uid)?;
    self.set_admin(uid, true).await?;
    Ok(RoleChange { message: format!("Granted admin role to {uid}") })
  }

  /// `revokeAdminRole`: remove admin from `uid`. The caller must be an
  /// admin and may not revoke their own role.
  pub async fn revoke_admin_role(
    &self,
    caller: Option<&AuthUser>,
    uid: &str,
  ) -> Result<RoleChange> {
    let caller = require_admin(caller)?;
    let uid = require_uid(uid)?;
    if caller.uid == uid {
      return Err(FunctionError::FailedPrecondition(
        "You cannot revoke your own admin role".into(),
      ));
    }
    self.set_admin(uid, false).await?;
    Ok(RoleChange { message: format!("Revoked admin role from {uid}") })
  }

  /// Grant admin without a caller check, for creating the first admin from
  /// the command line.
  pub async fn bootstrap_admin(&self, uid: &str) -> Result<RoleChange> {
    let uid = require_uid(uid)?;
    self.set_admin(uid, true).await?;
    Ok(RoleChange {
      message: format!("Granted admin role to {uid}; sign in again to refresh the session"),
    })
  }

  async fn set_admin(&self, uid: &str, admin: bool) -> Result<()> {
    let action = if admin { "grant" } else { "revoke" };

    self.auth.set_custom_claims(uid, CustomClaims { admin }).await.map_err(|e| {
      tracing::error!(%uid, error = %e, "failed to {action} admin claim");
      FunctionError::Internal(format!("Failed to {action} admin role for {uid}: {e}"))
    })?;

    self.store.merge_user(uid, UserPatch::admin(admin)).await.map_err(|e| {
      tracing::error!(%uid, error = %e, "admin claim changed but profile mirror failed");
      FunctionError::Internal(format!("Failed to {action} admin role for {uid}: {e}"))
    })?;

    tracing::info!(%uid, admin, "admin role updated");
    Ok(())
  }
}

pub(crate) fn require_admin(caller: Option<&AuthUser>) -> Result<&AuthUser> {
  match caller {
    Some(user) if user.is_admin() => Ok(user),
    _ => {
      tracing::info!(caller = caller.map(|u| u.uid.as_str()), "permission denied: caller is not an admin");
      Err(FunctionError::PermissionDenied("You must be an admin to do this".into()))
    }
  }
}

fn require_uid(uid: &str) -> Result<&str> {
  let uid = uid.trim();
  if uid.is_empty() {
    return Err(FunctionError::InvalidArgument("A target user uid is required".into()));
  }
  Ok(uid)
}
