//! Core types and trait definitions for the Cairn knowledge base.
//!
//! No HTTP or database dependencies. The store adapter, the client and the
//! callable functions all build on the types and traits defined here.

#![allow(async_fn_in_trait)]

pub mod article;
pub mod auth;
pub mod error;
pub mod notification;
pub mod store;
pub mod user;

pub use error::{Error, ErrorCode, Result};
