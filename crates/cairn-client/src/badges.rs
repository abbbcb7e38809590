//! Badge counters: unread notifications and articles awaiting review.
//!
//! Both are count-only queries against the store with local adjustments in
//! between, so the UI can update a badge without another round trip.

use std::sync::Arc;

use cairn_core::{
  ErrorCode,
  article::ArticleStatus,
  auth::AuthUser,
  notification::NotificationMessage,
  store::{ArticleFilter, DocumentStore},
};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{AppError, ErrorLog};

/// State of one badge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BadgeState {
  pub count:      u64,
  pub is_loading: bool,
  pub error:      Option<AppError>,
}

/// A reactive counter with saturating local adjustments.
#[derive(Debug)]
pub struct Badge {
  state: watch::Sender<BadgeState>,
}

impl Default for Badge {
  fn default() -> Self { Self { state: watch::Sender::new(BadgeState::default()) } }
}

impl Badge {
  pub fn count(&self) -> u64 { self.state.borrow().count }

  pub fn state(&self) -> BadgeState { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<BadgeState> { self.state.subscribe() }

  pub fn increment(&self, by: u64) { self.state.send_modify(|s| s.count += by); }

  pub fn decrement(&self, by: u64) {
    self.state.send_modify(|s| s.count = s.count.saturating_sub(by));
  }

  /// Zero the count and clear any error.
  pub fn reset(&self) {
    self.state.send_modify(|s| {
      s.count = 0;
      s.error = None;
    });
  }

  fn begin(&self) {
    self.state.send_modify(|s| {
      s.is_loading = true;
      s.error = None;
    });
  }

  fn set(&self, count: u64) {
    self.state.send_modify(|s| {
      s.count = count;
      s.is_loading = false;
    });
  }

  fn fail(&self, error: AppError) {
    self.state.send_modify(|s| {
      s.count = 0;
      s.is_loading = false;
      s.error = Some(error);
    });
  }
}

fn badge_error<E: std::error::Error + ErrorCode>(
  err: &E,
  user_message: &str,
  context: &str,
) -> AppError {
  AppError::from_backend(err, Some(user_message)).with_context(context)
}

// ─── NotificationCenter ──────────────────────────────────────────────────────

/// Unread-notification badge plus the notification list operations.
pub struct NotificationCenter<S> {
  store:  Arc<S>,
  errors: Arc<ErrorLog>,
  badge:  Badge,
}

impl<S: DocumentStore> NotificationCenter<S> {
  pub fn new(store: Arc<S>, errors: Arc<ErrorLog>) -> Self {
    Self { store, errors, badge: Badge::default() }
  }

  pub fn badge(&self) -> &Badge { &self.badge }

  pub fn unread_count(&self) -> u64 { self.badge.count() }

  /// Count `user`'s unread notifications. Signed out means zero, without a
  /// query. Failures zero the count and record the error.
  pub async fn fetch_unread_count(&self, user: Option<&AuthUser>) -> u64 {
    let Some(user) = user else {
      self.badge.set(0);
      return 0;
    };
    self.badge.begin();
    match self.store.count_notifications(&user.uid, Some(false)).await {
      Ok(count) => {
        self.badge.set(count);
        count
      }
      Err(err) => {
        let error = self.errors.report(badge_error(
          &err,
          "Could not load the notification count",
          "notifications",
        ));
        self.badge.fail(error);
        0
      }
    }
  }

  pub async fn refresh_unread_count(&self, user: Option<&AuthUser>) -> u64 {
    self.fetch_unread_count(user).await
  }

  pub fn increment_unread(&self, by: u64) { self.badge.increment(by); }

  pub fn decrement_unread(&self, by: u64) { self.badge.decrement(by); }

  pub fn reset_unread(&self) { self.badge.reset(); }

  /// Notifications for `uid`, newest first.
  pub async fn list(
    &self,
    uid: &str,
    unread_only: bool,
    limit: Option<usize>,
  ) -> Result<Vec<NotificationMessage>, S::Error> {
    let read = unread_only.then_some(false);
    self.store.list_notifications(uid, read, limit).await.inspect_err(|err| {
      self.errors.report(badge_error(err, "Could not load notifications", "notifications"));
    })
  }

  /// Mark a notification read and take it off the badge.
  pub async fn mark_read(&self, id: Uuid) -> Result<(), S::Error> {
    match self.store.mark_notification_read(id).await {
      Ok(()) => {
        self.badge.decrement(1);
        Ok(())
      }
      Err(err) => {
        self.errors.report(badge_error(&err, "Could not update the notification", "notifications"));
        Err(err)
      }
    }
  }
}

// ─── ReviewQueue ─────────────────────────────────────────────────────────────

/// Pending-review badge for admins.
pub struct ReviewQueue<S> {
  store:  Arc<S>,
  errors: Arc<ErrorLog>,
  badge:  Badge,
}

impl<S: DocumentStore> ReviewQueue<S> {
  pub fn new(store: Arc<S>, errors: Arc<ErrorLog>) -> Self {
    Self { store, errors, badge: Badge::default() }
  }

  pub fn badge(&self) -> &Badge { &self.badge }

  pub fn pending_count(&self) -> u64 { self.badge.count() }

  /// Count articles with status `pending`. Zero without a query when signed
  /// out.
  pub async fn fetch_pending_count(&self, user: Option<&AuthUser>) -> u64 {
    if user.is_none() {
      self.badge.set(0);
      return 0;
    }
    self.badge.begin();
    let filter = ArticleFilter::with_status(ArticleStatus::Pending);
    match self.store.count_articles(&filter).await {
      Ok(count) => {
        self.badge.set(count);
        count
      }
      Err(err) => {
        let error = self.errors.report(badge_error(
          &err,
          "Could not load the pending article count",
          "review",
        ));
        self.badge.fail(error);
        0
      }
    }
  }

  pub async fn refresh_pending_count(&self, user: Option<&AuthUser>) -> u64 {
    self.fetch_pending_count(user).await
  }

  pub fn increment_pending(&self, by: u64) { self.badge.increment(by); }

  pub fn decrement_pending(&self, by: u64) { self.badge.decrement(by); }

  pub fn reset_pending(&self) { self.badge.reset(); }
}

/// Whether the `users` profile of `uid` is flagged admin. For display only:
/// authorisation decisions use the session's claims.
pub async fn check_is_admin<S: DocumentStore>(store: &S, uid: &str) -> Result<bool, S::Error> {
  Ok(store.get_user(uid).await?.is_some_and(|profile| profile.is_admin))
}
