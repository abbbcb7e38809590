//! Shared fixtures: a `DocumentStore` wrapper over `SqliteStore` that counts
//! article queries, can be told to fail reads or writes and can hold list
//! results back for a while.

#![allow(dead_code)]

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
  },
  time::Duration,
};

use cairn_core::{
  article::{Article, ArticlePatch, ArticleStatus, NewArticle},
  notification::{NewNotification, NotificationMessage},
  store::{ArticleFilter, ArticleQuery, DocumentStore},
  user::{UserPatch, UserProfile},
};
use cairn_store_sqlite::{Error, SqliteStore};
use uuid::Uuid;

#[derive(Clone)]
pub struct CountingStore {
  pub inner:   SqliteStore,
  queries:     Arc<AtomicUsize>,
  fail_reads:  Arc<AtomicBool>,
  fail_writes: Arc<AtomicBool>,
  delay_ms:    Arc<AtomicU64>,
}

impl CountingStore {
  pub async fn new() -> Self {
    Self {
      inner:       SqliteStore::open_in_memory().await.expect("in-memory store"),
      queries:     Arc::default(),
      fail_reads:  Arc::default(),
      fail_writes: Arc::default(),
      delay_ms:    Arc::default(),
    }
  }

  /// Article list queries issued so far.
  pub fn queries(&self) -> usize { self.queries.load(Ordering::SeqCst) }

  pub fn fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

  pub fn fail_writes(&self, fail: bool) { self.fail_writes.store(fail, Ordering::SeqCst); }

  /// Hold every list query's results for `delay` before returning them. The
  /// query itself runs immediately, so the results reflect the store as it
  /// was when the fetch started.
  pub fn delay_queries(&self, delay: Duration) {
    self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
  }

  fn check(&self) -> Result<(), Error> {
    if self.fail_reads.load(Ordering::SeqCst) {
      Err(Error::DateParse("injected failure".into()))
    } else {
      Ok(())
    }
  }

  fn check_write(&self) -> Result<(), Error> {
    if self.fail_writes.load(Ordering::SeqCst) {
      Err(Error::NotFound { collection: "articles", id: "injected".into() })
    } else {
      Ok(())
    }
  }

  pub async fn seed(&self, title: &str, category: &str, status: ArticleStatus) -> Article {
    let mut input = NewArticle::submission("author", title, format!("Notes on {title}"), category);
    input.status = status;
    self.inner.add_article(input).await.expect("seed article")
  }
}

impl DocumentStore for CountingStore {
  type Error = Error;

  async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, Error> {
    self.queries.fetch_add(1, Ordering::SeqCst);
    self.check()?;
    let results = self.inner.query_articles(query).await;
    let delay = self.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    results
  }

  async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, Error> {
    self.check()?;
    self.inner.count_articles(filter).await
  }

  async fn get_article(&self, id: Uuid) -> Result<Option<Article>, Error> {
    self.check()?;
    self.inner.get_article(id).await
  }

  async fn add_article(&self, input: NewArticle) -> Result<Article, Error> {
    self.check_write()?;
    self.inner.add_article(input).await
  }

  async fn update_article(&self, id: Uuid, patch: ArticlePatch) -> Result<(), Error> {
    self.check_write()?;
    self.inner.update_article(id, patch).await
  }

  async fn delete_article(&self, id: Uuid) -> Result<(), Error> {
    self.check_write()?;
    self.inner.delete_article(id).await
  }

  async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, Error> {
    self.inner.get_user(uid).await
  }

  async fn list_users(&self) -> Result<Vec<UserProfile>, Error> { self.inner.list_users().await }

  async fn merge_user(&self, uid: &str, patch: UserPatch) -> Result<UserProfile, Error> {
    self.inner.merge_user(uid, patch).await
  }

  async fn add_notification(&self, input: NewNotification) -> Result<NotificationMessage, Error> {
    self.inner.add_notification(input).await
  }

  async fn list_notifications(
    &self,
    uid: &str,
    read: Option<bool>,
    limit: Option<usize>,
  ) -> Result<Vec<NotificationMessage>, Error> {
    self.inner.list_notifications(uid, read, limit).await
  }

  async fn count_notifications(&self, uid: &str, read: Option<bool>) -> Result<u64, Error> {
    self.check()?;
    self.inner.count_notifications(uid, read).await
  }

  async fn mark_notification_read(&self, id: Uuid) -> Result<(), Error> {
    self.inner.mark_notification_read(id).await
  }
}
