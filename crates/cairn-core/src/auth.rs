//! Identity types and the [`AuthService`] trait.
//!
//! The auth service owns accounts, session tokens and custom claims. Claims
//! are what authorisation decisions are made on; the `users` collection only
//! mirrors them for display.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::ErrorCode;

/// Attributes embedded in a user's session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomClaims {
  #[serde(default)]
  pub admin: bool,
}

/// The identity a session resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  #[serde(rename = "photoURL")]
  pub photo_url:    Option<String>,
  #[serde(default)]
  pub claims:       CustomClaims,
}

impl AuthUser {
  pub fn is_admin(&self) -> bool { self.claims.admin }
}

/// An issued session: the opaque bearer token and the identity behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub token: String,
  pub user:  AuthUser,
}

/// Input to [`AuthService::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:        String,
  pub password:     String,
  pub display_name: Option<String>,
  pub photo_url:    Option<String>,
}

/// Abstraction over the identity backend.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers and spawned tasks.
pub trait AuthService: Send + Sync {
  type Error: std::error::Error + ErrorCode + Send + Sync + 'static;

  /// Register an account. Fails with `auth/email-already-in-use` when the
  /// email is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<AuthUser, Self::Error>> + Send + '_;

  /// Exchange credentials for a fresh session.
  fn sign_in_with_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + 'a;

  /// Resolve a bearer token to its user, with claims as they are *now*.
  /// Returns `None` for unknown or revoked tokens.
  fn verify_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<AuthUser>, Self::Error>> + Send + 'a;

  /// Revoke a session token. Unknown tokens are ignored.
  fn sign_out<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_account<'a>(
    &'a self,
    uid: &'a str,
  ) -> impl Future<Output = Result<Option<AuthUser>, Self::Error>> + Send + 'a;

  /// Replace the custom claims of `uid`. Fails with `auth/user-not-found`
  /// for unknown accounts.
  fn set_custom_claims<'a>(
    &'a self,
    uid: &'a str,
    claims: CustomClaims,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
