//! The `DocumentStore` trait and supporting query types.
//!
//! The trait is implemented by backend adapters (e.g. `cairn-store-sqlite`).
//! Higher layers (`cairn-client`, `cairn-functions`) depend on this
//! abstraction, not on any concrete backend.
//!
//! Query capabilities are those of the hosted document database: equality
//! filters, a single ordering field, a result limit and a count-only query.
//! Anything richer (text search in particular) happens in the client.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ErrorCode,
  article::{Article, ArticleField, ArticlePatch, ArticleStatus, Direction, NewArticle},
  notification::{NewNotification, NotificationMessage},
  user::{UserPatch, UserProfile},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Equality constraints over the `articles` collection. Unset fields do not
/// constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFilter {
  pub status:   Option<ArticleStatus>,
  pub category: Option<String>,
  pub uid:      Option<String>,
  pub featured: Option<bool>,
}

impl ArticleFilter {
  pub fn with_status(status: ArticleStatus) -> Self {
    Self { status: Some(status), ..Self::default() }
  }

  /// Whether `article` satisfies every set constraint.
  pub fn matches(&self, article: &Article) -> bool {
    self.status.is_none_or(|s| article.status == s)
      && self.category.as_ref().is_none_or(|c| &article.category == c)
      && self.uid.as_ref().is_none_or(|u| &article.uid == u)
      && self.featured.is_none_or(|f| article.is_featured == f)
  }
}

/// Parameters for [`DocumentStore::query_articles`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleQuery {
  pub filter:    ArticleFilter,
  pub order_by:  ArticleField,
  pub direction: Direction,
  pub limit:     Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document database backing Cairn.
///
/// Timestamps (`created_at`, `updated_at`, `reviewed_at`) are generated by
/// the store, never accepted from callers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + ErrorCode + Send + Sync + 'static;

  // ── Articles ──────────────────────────────────────────────────────────

  /// Run a filtered, ordered, limited query over `articles`.
  fn query_articles<'a>(
    &'a self,
    query: &'a ArticleQuery,
  ) -> impl Future<Output = Result<Vec<Article>, Self::Error>> + Send + 'a;

  /// Count the articles matching `filter` without fetching them.
  fn count_articles<'a>(
    &'a self,
    filter: &'a ArticleFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Retrieve an article by id. Returns `None` if not found.
  fn get_article(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Article>, Self::Error>> + Send + '_;

  /// Persist a new article and return it with its assigned id and
  /// creation timestamp.
  fn add_article(
    &self,
    input: NewArticle,
  ) -> impl Future<Output = Result<Article, Self::Error>> + Send + '_;

  /// Apply a partial update. Fails with `not-found` if the article does not
  /// exist.
  fn update_article(
    &self,
    id: Uuid,
    patch: ArticlePatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete an article. Deleting a missing article is not an error.
  fn delete_article(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn get_user<'a>(
    &'a self,
    uid: &'a str,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + 'a;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<UserProfile>, Self::Error>> + Send + '_;

  /// Merge `patch` into the profile of `uid`, creating it if absent.
  fn merge_user<'a>(
    &'a self,
    uid: &'a str,
    patch: UserPatch,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + 'a;

  // ── Notifications ─────────────────────────────────────────────────────

  fn add_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<NotificationMessage, Self::Error>> + Send + '_;

  /// Notifications for `uid`, newest first, optionally filtered on `read`.
  fn list_notifications<'a>(
    &'a self,
    uid: &'a str,
    read: Option<bool>,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<NotificationMessage>, Self::Error>> + Send + 'a;

  fn count_notifications<'a>(
    &'a self,
    uid: &'a str,
    read: Option<bool>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Set the `read` flag. Fails with `not-found` for unknown ids.
  fn mark_notification_read(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
