//! Short-lived cache of article query results.
//!
//! Keys are cache signatures: the canonical JSON serialisation of a fully
//! resolved option set. Entries expire lazily on read once they are `ttl` old.
//! Any write to the `articles` collection clears the whole cache; no attempt
//! is made to work out which pages a write affects.
//!
//! Every clear bumps an epoch. A fetch notes the epoch before querying and
//! stores its page only if no clear happened meanwhile, so a page read before
//! a write can't land in the cache after it.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
  time::Duration,
};

use cairn_core::article::Article;
use serde::Serialize;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
  articles:    Vec<Article>,
  inserted_at: Instant,
}

/// Canonical cache signature for `options`.
///
/// Serialises through [`serde_json::Value`], whose objects keep their keys
/// sorted, so the signature does not depend on field or insertion order.
pub fn cache_key<T: Serialize>(options: &T) -> Result<String, serde_json::Error> {
  let value = serde_json::to_value(options)?;
  serde_json::to_string(&value)
}

#[derive(Default)]
struct Entries {
  epoch: u64,
  pages: HashMap<String, CacheEntry>,
}

/// Process-wide article page cache. Share it behind an `Arc`.
pub struct ArticleCache {
  ttl:     Duration,
  entries: Mutex<Entries>,
}

impl Default for ArticleCache {
  fn default() -> Self { Self::new(DEFAULT_TTL) }
}

impl ArticleCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, entries: Mutex::new(Entries::default()) }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// A copy of the cached page for `key`, if present and younger than the
  /// TTL.
  pub fn get(&self, key: &str) -> Option<Vec<Article>> { self.get_at(key, Instant::now()) }

  pub fn insert(&self, key: String, articles: &[Article]) {
    self.insert_at(key, articles, Instant::now());
  }

  /// The current invalidation epoch.
  pub fn epoch(&self) -> u64 { self.lock().epoch }

  /// Store `articles` under `key` unless the cache was invalidated since
  /// `epoch` was read. Returns whether the page was stored.
  pub fn insert_if_current(&self, key: String, articles: &[Article], epoch: u64) -> bool {
    let mut entries = self.lock();
    if entries.epoch != epoch {
      tracing::debug!(%key, "cache invalidated during fetch, page not stored");
      return false;
    }
    entries
      .pages
      .insert(key, CacheEntry { articles: articles.to_vec(), inserted_at: Instant::now() });
    true
  }

  /// Drop every entry and start a new epoch.
  pub fn invalidate_all(&self) {
    let mut entries = self.lock();
    if !entries.pages.is_empty() {
      tracing::debug!(entries = entries.pages.len(), "article cache invalidated");
    }
    entries.pages.clear();
    entries.epoch += 1;
  }

  /// Number of stored entries, expired ones included until they are read.
  pub fn len(&self) -> usize { self.lock().pages.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn get_at(&self, key: &str, now: Instant) -> Option<Vec<Article>> {
    let mut entries = self.lock();
    let entry = entries.pages.get(key)?;
    if now.saturating_duration_since(entry.inserted_at) >= self.ttl {
      entries.pages.remove(key);
      return None;
    }
    Some(entry.articles.clone())
  }

  fn insert_at(&self, key: String, articles: &[Article], now: Instant) {
    self.lock().pages.insert(key, CacheEntry { articles: articles.to_vec(), inserted_at: now });
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use cairn_core::article::ArticleStatus;

  fn article(title: &str) -> Article {
    Article {
      id:             Uuid::new_v4(),
      title:          title.into(),
      content:        String::new(),
      category:       "routes".into(),
      uid:            "u1".into(),
      display_name:   None,
      created_at:     Utc::now(),
      updated_at:     None,
      status:         ArticleStatus::Approved,
      is_featured:    false,
      references:     None,
      summary:        None,
      image_url:      None,
      review_comment: None,
      reviewed_at:    None,
    }
  }

  #[test]
  fn key_ignores_property_order() {
    let a = json!({ "status": "approved", "category": "A" });
    let b = json!({ "category": "A", "status": "approved" });
    assert_eq!(cache_key(&a).unwrap(), cache_key(&b).unwrap());
  }

  #[test]
  fn entry_expires_at_ttl_boundary() {
    let cache = ArticleCache::default();
    let t0 = Instant::now();
    cache.insert_at("k".into(), &[article("a")], t0);

    let just_before = t0 + Duration::from_secs(4 * 60 + 59);
    assert_eq!(cache.get_at("k", just_before).map(|v| v.len()), Some(1));

    let just_after = t0 + Duration::from_secs(5 * 60 + 1);
    assert!(cache.get_at("k", just_after).is_none());
    // Lazily evicted on that read.
    assert!(cache.is_empty());
  }

  #[test]
  fn exactly_ttl_old_is_a_miss() {
    let cache = ArticleCache::new(Duration::from_secs(10));
    let t0 = Instant::now();
    cache.insert_at("k".into(), &[article("a")], t0);
    assert!(cache.get_at("k", t0 + Duration::from_secs(10)).is_none());
  }

  #[test]
  fn hit_returns_a_copy() {
    let cache = ArticleCache::default();
    cache.insert("k".into(), &[article("a")]);

    let mut first = cache.get("k").unwrap();
    first[0].title = "mutated".into();
    first.clear();

    let second = cache.get("k").unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].title, "a");
  }

  #[test]
  fn invalidate_all_clears_every_key() {
    let cache = ArticleCache::default();
    cache.insert("a".into(), &[]);
    cache.insert("b".into(), &[]);
    cache.invalidate_all();
    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_none());
  }

  #[test]
  fn page_read_before_invalidation_is_not_stored() {
    let cache = ArticleCache::default();
    let epoch = cache.epoch();
    cache.invalidate_all();

    assert!(!cache.insert_if_current("k".into(), &[article("stale")], epoch));
    assert!(cache.get("k").is_none());

    let epoch = cache.epoch();
    assert!(cache.insert_if_current("k".into(), &[article("fresh")], epoch));
    assert_eq!(cache.get("k").unwrap()[0].title, "fresh");
  }
}
