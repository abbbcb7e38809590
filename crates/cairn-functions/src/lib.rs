//! Privileged callable functions for Cairn.
//!
//! [`RoleService`] holds the role-mutation logic; [`router`] exposes it as
//! callable HTTP endpoints backed by any [`AuthService`] and
//! [`DocumentStore`].

#![allow(async_fn_in_trait)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod roles;

pub use error::FunctionError;
pub use roles::{RoleChange, RoleService};

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::post};
use cairn_core::{auth::AuthService, store::DocumentStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CAIRN_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/cairn/cairn.db"),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<A, S> {
  pub auth:  Arc<A>,
  pub roles: RoleService<A, S>,
}

impl<A, S> Clone for AppState<A, S> {
  fn clone(&self) -> Self {
    Self { auth: Arc::clone(&self.auth), roles: self.roles.clone() }
  }
}

impl<A: AuthService, S: DocumentStore> AppState<A, S> {
  pub fn new(auth: Arc<A>, store: Arc<S>) -> Self {
    Self { roles: RoleService::new(Arc::clone(&auth), store), auth }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the callable functions [`Router`].
pub fn router<A, S>(state: AppState<A, S>) -> Router
where
  A: AuthService + 'static,
  S: DocumentStore + 'static,
{
  Router::new()
    .route("/grantAdminRole",  post(handlers::grant_admin_role::<A, S>))
    .route("/revokeAdminRole", post(handlers::revoke_admin_role::<A, S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
