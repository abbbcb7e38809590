//! Article data access: parameterised queries, client-side search, the shared
//! page cache and the reactive list state UI code reads from.

use std::sync::Arc;

use cairn_core::{
  ErrorCode,
  article::{Article, ArticleField, ArticlePatch, ArticleStatus, Direction, NewArticle},
  store::{ArticleFilter, ArticleQuery, DocumentStore},
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  cache::{ArticleCache, cache_key},
  error::{AppError, ErrorLog, severity_for},
};

pub const FETCH_ARTICLES_ERROR: &str = "FETCH_ARTICLES_ERROR";
pub const ARTICLE_NOT_FOUND: &str = "ARTICLE_NOT_FOUND";
pub const FETCH_ARTICLE_ERROR: &str = "FETCH_ARTICLE_ERROR";
pub const CREATE_ARTICLE_ERROR: &str = "CREATE_ARTICLE_ERROR";
pub const UPDATE_ARTICLE_ERROR: &str = "UPDATE_ARTICLE_ERROR";
pub const DELETE_ARTICLE_ERROR: &str = "DELETE_ARTICLE_ERROR";

/// Labels the UI uses for "no category filter".
const ALL_CATEGORY_LABELS: &[&str] = &["all", "所有文章"];

// ─── Options ─────────────────────────────────────────────────────────────────

/// Category constraint of a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
  /// Sentinel: don't filter on category.
  #[default]
  All,
  Named(String),
}

impl Category {
  pub fn name(&self) -> Option<&str> {
    match self {
      Self::All => None,
      Self::Named(name) => Some(name),
    }
  }
}

impl From<&str> for Category {
  fn from(label: &str) -> Self {
    if label.is_empty() || ALL_CATEGORY_LABELS.contains(&label) {
      Self::All
    } else {
      Self::Named(label.to_owned())
    }
  }
}

impl From<String> for Category {
  fn from(label: String) -> Self { Self::from(label.as_str()) }
}

/// Parameters of [`ArticleRepository::fetch_articles`].
///
/// `status` defaults to `Some(Approved)`; `None` fetches every status.
/// `limit_count` defaults to the repository's page size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
  pub category:    Category,
  pub status:      Option<ArticleStatus>,
  pub uid:         Option<String>,
  pub featured:    Option<bool>,
  /// Case-insensitive substring over title and content, applied after the
  /// store query. A non-empty term bypasses the cache.
  pub search_term: Option<String>,
  pub limit_count: Option<usize>,
  pub order_by:    ArticleField,
  pub direction:   Direction,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      category:    Category::All,
      status:      Some(ArticleStatus::Approved),
      uid:         None,
      featured:    None,
      search_term: None,
      limit_count: None,
      order_by:    ArticleField::CreatedAt,
      direction:   Direction::Desc,
    }
  }
}

impl FetchOptions {
  pub fn category(category: impl Into<Category>) -> Self {
    Self { category: category.into(), ..Self::default() }
  }

  pub fn search(term: impl Into<String>) -> Self {
    Self { search_term: Some(term.into()), ..Self::default() }
  }

  pub fn with_status(mut self, status: Option<ArticleStatus>) -> Self {
    self.status = status;
    self
  }

  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit_count = Some(limit);
    self
  }

  /// The non-empty, lower-cased search term, if any.
  fn search_needle(&self) -> Option<String> {
    self.search_term.as_deref().filter(|t| !t.is_empty()).map(str::to_lowercase)
  }

  fn to_query(&self, limit: usize) -> ArticleQuery {
    ArticleQuery {
      filter:    ArticleFilter {
        status:   self.status,
        category: self.category.name().map(str::to_owned),
        uid:      self.uid.clone(),
        featured: self.featured,
      },
      order_by:  self.order_by,
      direction: self.direction,
      limit:     Some(limit),
    }
  }
}

fn matches_search(article: &Article, needle: &str) -> bool {
  article.title.to_lowercase().contains(needle)
    || article.content.to_lowercase().contains(needle)
}

// ─── State ───────────────────────────────────────────────────────────────────

/// The reactive state of one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleState {
  /// The most recently resolved list.
  pub articles:   Vec<Article>,
  pub is_loading: bool,
  pub error:      Option<AppError>,
  /// `true` when the last page came back full. A heuristic: a full last page
  /// still reports more.
  pub has_more:   bool,
}

impl Default for ArticleState {
  fn default() -> Self {
    Self { articles: Vec::new(), is_loading: false, error: None, has_more: true }
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

/// Reads and writes the `articles` collection on behalf of one view.
///
/// Repositories handed out by the same [`crate::context::AppContext`] share
/// one cache, so a write through any of them invalidates pages cached by all
/// of them. Concurrent fetches on the same repository are not ordered: the
/// one that resolves last wins.
pub struct ArticleRepository<S> {
  store:     Arc<S>,
  cache:     Arc<ArticleCache>,
  errors:    Arc<ErrorLog>,
  page_size: usize,
  state:     watch::Sender<ArticleState>,
}

impl<S: DocumentStore> ArticleRepository<S> {
  pub fn new(
    store: Arc<S>,
    cache: Arc<ArticleCache>,
    errors: Arc<ErrorLog>,
    page_size: usize,
  ) -> Self {
    Self {
      store,
      cache,
      errors,
      page_size,
      state: watch::Sender::new(ArticleState::default()),
    }
  }

  // ── State accessors ───────────────────────────────────────────────────

  pub fn state(&self) -> ArticleState { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<ArticleState> { self.state.subscribe() }

  pub fn articles(&self) -> Vec<Article> { self.state.borrow().articles.clone() }

  pub fn is_loading(&self) -> bool { self.state.borrow().is_loading }

  pub fn error(&self) -> Option<AppError> { self.state.borrow().error.clone() }

  pub fn has_more(&self) -> bool { self.state.borrow().has_more }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Fetch a page of articles.
  ///
  /// Never fails: on error the loaded list is left as it was, the error is
  /// recorded in state and an empty list is returned.
  pub async fn fetch_articles(&self, options: FetchOptions) -> Vec<Article> {
    let limit = options.limit_count.unwrap_or(self.page_size);
    let needle = options.search_needle();

    let key = match needle {
      Some(_) => None,
      None => self.signature(&options, limit),
    };

    if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
      tracing::debug!(count = hit.len(), "article cache hit");
      self.state.send_modify(|s| {
        s.has_more = hit.len() == limit;
        s.articles = hit.clone();
        s.error = None;
      });
      return hit;
    }

    let epoch = self.cache.epoch();
    self.begin();
    match self.store.query_articles(&options.to_query(limit)).await {
      Ok(mut results) => {
        if let Some(needle) = &needle {
          results.retain(|a| matches_search(a, needle));
        }
        if let Some(key) = key {
          tracing::debug!(count = results.len(), "article cache miss, storing page");
          self.cache.insert_if_current(key, &results, epoch);
        }
        self.state.send_modify(|s| {
          s.has_more = results.len() == limit;
          s.articles = results.clone();
          s.is_loading = false;
        });
        results
      }
      Err(err) => {
        self.fail(FETCH_ARTICLES_ERROR, &err, "Failed to load articles, please try again later");
        Vec::new()
      }
    }
  }

  /// Read one article. `None` both when it doesn't exist and on failure; the
  /// recorded error tells the two apart.
  pub async fn fetch_article_by_id(&self, id: Uuid) -> Option<Article> {
    self.begin();
    match self.store.get_article(id).await {
      Ok(Some(article)) => {
        self.finish();
        Some(article)
      }
      Ok(None) => {
        let error = self.errors.report(
          AppError::new(ARTICLE_NOT_FOUND, format!("article {id} not found"), "Article not found")
            .with_context("articles"),
        );
        self.state.send_modify(|s| {
          s.error = Some(error);
          s.is_loading = false;
        });
        None
      }
      Err(err) => {
        self.fail(FETCH_ARTICLE_ERROR, &err, "Failed to load the article");
        None
      }
    }
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create an article and return its id. The creation timestamp is assigned
  /// by the store.
  pub async fn create_article(&self, input: NewArticle) -> Result<Uuid, S::Error> {
    self.begin();
    match self.store.add_article(input).await {
      Ok(article) => {
        self.cache.invalidate_all();
        self.finish();
        tracing::debug!(id = %article.id, "article created");
        Ok(article.id)
      }
      Err(err) => {
        self.fail(CREATE_ARTICLE_ERROR, &err, "Failed to create the article, please try again later");
        Err(err)
      }
    }
  }

  /// Apply a partial update, patching the loaded copy if it is in the list.
  pub async fn update_article(&self, id: Uuid, patch: ArticlePatch) -> Result<(), S::Error> {
    self.begin();
    match self.store.update_article(id, patch.clone()).await {
      Ok(()) => {
        self.cache.invalidate_all();
        self.state.send_modify(|s| {
          if let Some(article) = s.articles.iter_mut().find(|a| a.id == id) {
            patch.apply_to(article);
          }
          s.is_loading = false;
        });
        Ok(())
      }
      Err(err) => {
        self.fail(UPDATE_ARTICLE_ERROR, &err, "Failed to update the article, please try again later");
        Err(err)
      }
    }
  }

  pub async fn delete_article(&self, id: Uuid) -> Result<(), S::Error> {
    self.begin();
    match self.store.delete_article(id).await {
      Ok(()) => {
        self.cache.invalidate_all();
        self.state.send_modify(|s| {
          s.articles.retain(|a| a.id != id);
          s.is_loading = false;
        });
        Ok(())
      }
      Err(err) => {
        self.fail(DELETE_ARTICLE_ERROR, &err, "Failed to delete the article, please try again later");
        Err(err)
      }
    }
  }

  /// Reset the list, the error and `has_more`.
  pub fn clear_articles(&self) {
    self.state.send_modify(|s| {
      s.articles.clear();
      s.error = None;
      s.has_more = true;
    });
  }

  // ── Views over the loaded list ────────────────────────────────────────

  pub fn featured(&self) -> Vec<Article> { self.project(|a| a.is_featured) }

  pub fn approved(&self) -> Vec<Article> { self.project(|a| a.status == ArticleStatus::Approved) }

  pub fn pending(&self) -> Vec<Article> { self.project(|a| a.status == ArticleStatus::Pending) }

  pub fn in_category(&self, category: &str) -> Vec<Article> {
    match Category::from(category) {
      Category::All => self.articles(),
      Category::Named(name) => self.project(|a| a.category == name),
    }
  }

  /// The `n` most recently created loaded articles, newest first.
  pub fn recent(&self, n: usize) -> Vec<Article> {
    let mut articles = self.articles();
    articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    articles.truncate(n);
    articles
  }

  // ── Internals ─────────────────────────────────────────────────────────

  fn project(&self, keep: impl Fn(&Article) -> bool) -> Vec<Article> {
    self.state.borrow().articles.iter().filter(|a| keep(a)).cloned().collect()
  }

  /// Cache signature with defaults resolved, so an omitted option and its
  /// explicit default share an entry.
  fn signature(&self, options: &FetchOptions, limit: usize) -> Option<String> {
    let resolved = FetchOptions { limit_count: Some(limit), search_term: None, ..options.clone() };
    match cache_key(&resolved) {
      Ok(key) => Some(key),
      Err(err) => {
        tracing::warn!(%err, "could not build cache signature, bypassing cache");
        None
      }
    }
  }

  fn begin(&self) {
    self.state.send_modify(|s| {
      s.is_loading = true;
      s.error = None;
    });
  }

  fn finish(&self) { self.state.send_modify(|s| s.is_loading = false); }

  fn fail<E>(&self, code: &str, err: &E, user_message: &str)
  where
    E: std::error::Error + ErrorCode,
  {
    let mut error = AppError::new(code, format!("{}: {err}", err.code()), user_message)
      .with_context("articles");
    error.severity = severity_for(err.code());
    let error = self.errors.report(error);
    self.state.send_modify(|s| {
      s.error = Some(error);
      s.is_loading = false;
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn all_labels_map_to_sentinel() {
    assert_eq!(Category::from("all"), Category::All);
    assert_eq!(Category::from("所有文章"), Category::All);
    assert_eq!(Category::from(""), Category::All);
    assert_eq!(Category::from("gear"), Category::Named("gear".into()));
  }

  #[test]
  fn query_skips_unset_constraints() {
    let query = FetchOptions::default().to_query(10);
    assert_eq!(query.filter, ArticleFilter::with_status(ArticleStatus::Approved));
    assert_eq!(query.limit, Some(10));

    let any_status = FetchOptions::category("gear").with_status(None).to_query(5);
    assert_eq!(any_status.filter.status, None);
    assert_eq!(any_status.filter.category.as_deref(), Some("gear"));
  }

  #[test]
  fn empty_search_term_is_no_search() {
    assert_eq!(FetchOptions::search("").search_needle(), None);
    assert_eq!(FetchOptions::search("YuShan").search_needle().as_deref(), Some("yushan"));
  }
}
