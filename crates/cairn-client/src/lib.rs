//! Client-side data access for Cairn.
//!
//! The pieces a UI talks to: [`articles::ArticleRepository`] for the
//! `articles` collection (with its short-lived page cache),
//! [`auth::AuthSession`] for the shared sign-in state, badge counters,
//! form validation and the callable role functions. [`context::AppContext`]
//! wires them together over one [`cairn_core::store::DocumentStore`].

#![allow(async_fn_in_trait)]

pub mod articles;
pub mod auth;
pub mod badges;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod functions;
pub mod markdown;
pub mod retry;
pub mod validation;

pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{AppError, ErrorLog, Severity};
