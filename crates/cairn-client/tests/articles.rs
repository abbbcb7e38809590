mod common;

use std::{sync::Arc, time::Duration};

use cairn_client::{
  ErrorLog,
  articles::{
    ARTICLE_NOT_FOUND, ArticleRepository, CREATE_ARTICLE_ERROR, DELETE_ARTICLE_ERROR,
    FETCH_ARTICLE_ERROR, FETCH_ARTICLES_ERROR, FetchOptions, UPDATE_ARTICLE_ERROR,
  },
  cache::ArticleCache,
};
use cairn_core::{
  ErrorCode as _,
  article::{ArticlePatch, ArticleStatus, NewArticle},
  store::DocumentStore,
};
use common::CountingStore;
use uuid::Uuid;

struct Fixture {
  store: Arc<CountingStore>,
  cache: Arc<ArticleCache>,
  repo:  ArticleRepository<CountingStore>,
}

impl Fixture {
  async fn new() -> Self {
    let store = Arc::new(CountingStore::new().await);
    let cache = Arc::new(ArticleCache::default());
    let repo = Self::repo_over(&store, &cache);
    Self { store, cache, repo }
  }

  fn repo_over(store: &Arc<CountingStore>, cache: &Arc<ArticleCache>) -> ArticleRepository<CountingStore> {
    ArticleRepository::new(Arc::clone(store), Arc::clone(cache), Arc::new(ErrorLog::default()), 10)
  }

  /// A second repository sharing this fixture's store and cache.
  fn another_repo(&self) -> ArticleRepository<CountingStore> {
    Self::repo_over(&self.store, &self.cache)
  }
}

// ── Cache ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_fetch_is_served_from_cache() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  let first = f.repo.fetch_articles(FetchOptions::default()).await;
  let second = f.repo.fetch_articles(FetchOptions::default()).await;

  assert_eq!(first.len(), 1);
  assert_eq!(first, second);
  assert_eq!(f.store.queries(), 1);
  assert_eq!(f.repo.articles(), second);
}

#[tokio::test]
async fn default_limit_and_explicit_limit_share_an_entry() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  f.repo.fetch_articles(FetchOptions::default()).await;
  f.repo.fetch_articles(FetchOptions::default().with_limit(10)).await;
  assert_eq!(f.store.queries(), 1);

  f.repo.fetch_articles(FetchOptions::default().with_limit(5)).await;
  assert_eq!(f.store.queries(), 2);
}

#[tokio::test]
async fn distinct_filters_are_cached_separately() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;
  f.store.seed("Stove care", "gear", ArticleStatus::Approved).await;

  let trails = f.repo.fetch_articles(FetchOptions::category("trails")).await;
  let gear = f.repo.fetch_articles(FetchOptions::category("gear")).await;
  let all = f.repo.fetch_articles(FetchOptions::category("all")).await;

  assert_eq!(trails.len(), 1);
  assert_eq!(gear.len(), 1);
  assert_eq!(all.len(), 2);
  assert_eq!(f.store.queries(), 3);
  assert_eq!(f.cache.len(), 3);
}

#[tokio::test]
async fn search_bypasses_the_cache_both_ways() {
  let f = Fixture::new().await;
  f.store.seed("Jade lake loop", "trails", ArticleStatus::Approved).await;
  f.store.seed("Stove care", "gear", ArticleStatus::Approved).await;

  f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.cache.len(), 1);

  let hits = f.repo.fetch_articles(FetchOptions::search("JADE")).await;
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].title, "Jade lake loop");

  f.repo.fetch_articles(FetchOptions::search("jade")).await;
  assert_eq!(f.store.queries(), 3);
  assert_eq!(f.cache.len(), 1);
}

#[tokio::test]
async fn search_matches_content_too() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  // Seeded content is "Notes on <title>".
  let hits = f.repo.fetch_articles(FetchOptions::search("notes on ridge")).await;
  assert_eq!(hits.len(), 1);
  assert!(f.repo.fetch_articles(FetchOptions::search("glacier")).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cached_page_expires_after_five_minutes() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  f.repo.fetch_articles(FetchOptions::default()).await;

  tokio::time::advance(Duration::from_secs(4 * 60 + 59)).await;
  f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.store.queries(), 1);

  tokio::time::advance(Duration::from_secs(2)).await;
  f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.store.queries(), 2);
}

#[tokio::test]
async fn writes_invalidate_every_cached_page() {
  let f = Fixture::new().await;
  let other = f.another_repo();
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  f.repo.fetch_articles(FetchOptions::default()).await;
  other.fetch_articles(FetchOptions::category("trails")).await;
  assert_eq!(f.cache.len(), 2);

  let mut input = NewArticle::submission("author", "Scree technique", "Lean out.", "skills");
  input.status = ArticleStatus::Approved;
  other.create_article(input).await.unwrap();
  assert!(f.cache.is_empty());

  let page = f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(page.len(), 2);
  assert_eq!(f.store.queries(), 3);
}

#[tokio::test]
async fn page_read_before_a_write_is_not_cached_after_it() {
  let f = Fixture::new().await;
  let writer = f.another_repo();
  f.store.delay_queries(Duration::from_millis(100));

  let (in_flight, created) = tokio::join!(f.repo.fetch_articles(FetchOptions::default()), async {
    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut input = NewArticle::submission("author", "Scree technique", "Lean out.", "skills");
    input.status = ArticleStatus::Approved;
    writer.create_article(input).await
  });
  created.unwrap();
  assert!(in_flight.is_empty());
  assert!(f.cache.is_empty());

  f.store.delay_queries(Duration::ZERO);
  let page = f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(page.len(), 1);
  assert_eq!(f.store.queries(), 2);
}

// ── Paging ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_page_reports_more() {
  let f = Fixture::new().await;
  for i in 0..10 {
    f.store.seed(&format!("Trail {i}"), "trails", ArticleStatus::Approved).await;
  }
  let page = f.repo.fetch_articles(FetchOptions::default().with_limit(10)).await;
  assert_eq!(page.len(), 10);
  assert!(f.repo.has_more());
}

#[tokio::test]
async fn short_page_reports_no_more() {
  let f = Fixture::new().await;
  for i in 0..9 {
    f.store.seed(&format!("Trail {i}"), "trails", ArticleStatus::Approved).await;
  }
  let page = f.repo.fetch_articles(FetchOptions::default().with_limit(10)).await;
  assert_eq!(page.len(), 9);
  assert!(!f.repo.has_more());

  // A cache hit recomputes the flag as well.
  f.repo.fetch_articles(FetchOptions::default().with_limit(10)).await;
  assert!(!f.repo.has_more());
  assert_eq!(f.store.queries(), 1);
}

#[tokio::test]
async fn pages_are_newest_first() {
  let f = Fixture::new().await;
  f.store.seed("Older", "trails", ArticleStatus::Approved).await;
  f.store.seed("Newer", "trails", ArticleStatus::Approved).await;

  let page = f.repo.fetch_articles(FetchOptions::default()).await;
  let titles: Vec<_> = page.iter().map(|a| a.title.as_str()).collect();
  assert_eq!(titles, ["Newer", "Older"]);
  assert_eq!(f.repo.recent(1)[0].title, "Newer");
}

// ── Single reads and failures ────────────────────────────────────────────────

#[tokio::test]
async fn fetch_by_id_distinguishes_missing_from_present() {
  let f = Fixture::new().await;
  let seeded = f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  let found = f.repo.fetch_article_by_id(seeded.id).await.unwrap();
  assert_eq!(found.title, "Ridge walk");
  assert!(f.repo.error().is_none());

  assert!(f.repo.fetch_article_by_id(Uuid::new_v4()).await.is_none());
  assert_eq!(f.repo.error().unwrap().code, ARTICLE_NOT_FOUND);
  assert!(!f.repo.is_loading());
}

#[tokio::test]
async fn failed_fetch_keeps_the_list_and_records_the_error() {
  let f = Fixture::new().await;
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;
  f.repo.fetch_articles(FetchOptions::default()).await;

  f.store.fail_reads(true);
  let page = f.repo.fetch_articles(FetchOptions::category("gear")).await;
  assert!(page.is_empty());

  let state = f.repo.state();
  assert_eq!(state.articles.len(), 1);
  assert!(!state.is_loading);
  let error = state.error.unwrap();
  assert_eq!(error.code, FETCH_ARTICLES_ERROR);
  assert!(error.message.starts_with("data-loss"));

  // A successful fetch clears the error.
  f.store.fail_reads(false);
  f.repo.fetch_articles(FetchOptions::category("gear")).await;
  assert!(f.repo.error().is_none());
}

#[tokio::test]
async fn failed_read_by_id_is_not_a_missing_article() {
  let f = Fixture::new().await;
  let seeded = f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  f.store.fail_reads(true);
  assert!(f.repo.fetch_article_by_id(seeded.id).await.is_none());
  let error = f.repo.error().unwrap();
  assert_eq!(error.code, FETCH_ARTICLE_ERROR);
  assert!(!f.repo.is_loading());
}

/// A repository holding one loaded, cached article, with writes failing.
async fn failing_writes() -> (Fixture, Uuid) {
  let f = Fixture::new().await;
  let seeded = f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;
  f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.cache.len(), 1);
  f.store.fail_writes(true);
  (f, seeded.id)
}

#[tokio::test]
async fn failed_create_is_returned_and_recorded() {
  let (f, _) = failing_writes().await;

  let err = f
    .repo
    .create_article(NewArticle::submission("hiker", "Jade lake loop", "Start early.", "trails"))
    .await
    .unwrap_err();
  assert_eq!(err.code(), "not-found");

  let state = f.repo.state();
  assert_eq!(state.error.unwrap().code, CREATE_ARTICLE_ERROR);
  assert!(!state.is_loading);
  assert_eq!(state.articles.len(), 1);
  assert_eq!(f.cache.len(), 1);
}

#[tokio::test]
async fn failed_update_leaves_the_loaded_copy_alone() {
  let (f, id) = failing_writes().await;

  let patch = ArticlePatch { title: Some("Renamed".into()), ..ArticlePatch::default() };
  assert!(f.repo.update_article(id, patch).await.is_err());

  let state = f.repo.state();
  assert_eq!(state.error.unwrap().code, UPDATE_ARTICLE_ERROR);
  assert!(!state.is_loading);
  assert_eq!(state.articles[0].title, "Ridge walk");
  assert_eq!(f.cache.len(), 1);
}

#[tokio::test]
async fn failed_delete_keeps_the_article() {
  let (f, id) = failing_writes().await;

  assert!(f.repo.delete_article(id).await.is_err());

  let state = f.repo.state();
  assert_eq!(state.error.unwrap().code, DELETE_ARTICLE_ERROR);
  assert!(!state.is_loading);
  assert_eq!(state.articles.len(), 1);
  assert_eq!(f.cache.len(), 1);
  assert!(f.store.get_article(id).await.unwrap().is_some());

  // The cached page is still served.
  f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.store.queries(), 1);
}

// ── Local projections ────────────────────────────────────────────────────────

#[tokio::test]
async fn update_and_delete_track_the_loaded_list() {
  let f = Fixture::new().await;
  let seeded = f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;
  f.repo.fetch_articles(FetchOptions::default()).await;

  let patch = ArticlePatch { is_featured: Some(true), ..ArticlePatch::default() };
  f.repo.update_article(seeded.id, patch).await.unwrap();
  assert_eq!(f.repo.featured().len(), 1);
  assert!(f.store.get_article(seeded.id).await.unwrap().unwrap().is_featured);

  f.repo.delete_article(seeded.id).await.unwrap();
  assert!(f.repo.articles().is_empty());
  assert!(f.store.get_article(seeded.id).await.unwrap().is_none());
}

// ── Review workflow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn approved_submission_appears_in_the_public_list() {
  let f = Fixture::new().await;
  let author = f.another_repo();
  let reviewer = f.another_repo();
  f.store.seed("Ridge walk", "trails", ArticleStatus::Approved).await;

  let id = author
    .create_article(NewArticle::submission("hiker", "Jade lake loop", "Start early.", "trails"))
    .await
    .unwrap();

  let public = f.repo.fetch_articles(FetchOptions::default()).await;
  assert!(public.iter().all(|a| a.id != id));

  let queue = reviewer
    .fetch_articles(FetchOptions::default().with_status(Some(ArticleStatus::Pending)))
    .await;
  assert_eq!(queue.len(), 1);
  assert_eq!(reviewer.pending().len(), 1);

  let queries_before = f.store.queries();
  reviewer
    .update_article(id, ArticlePatch::review(ArticleStatus::Approved, Some("Nice".into())))
    .await
    .unwrap();
  assert!(reviewer.pending().is_empty());

  let public = f.repo.fetch_articles(FetchOptions::default()).await;
  assert_eq!(f.store.queries(), queries_before + 1);
  let approved = public.iter().find(|a| a.id == id).unwrap();
  assert_eq!(approved.review_comment.as_deref(), Some("Nice"));
  assert!(approved.reviewed_at.is_some());
  assert!(approved.updated_at.is_some());
}
