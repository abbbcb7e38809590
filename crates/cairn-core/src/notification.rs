//! Notification messages: the documents of the `notifications` collection.
//!
//! Notifications are created by server-side triggers. Clients only ever flip
//! the `read` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a notification. Known kinds are enumerated; anything else is
/// kept verbatim in [`NotificationKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
  ArticlePublished,
  ArticleApproved,
  ArticleRejected,
  Comment,
  Mention,
  System,
  Status,
  Other(String),
}

impl NotificationKind {
  pub fn as_str(&self) -> &str {
    match self {
      Self::ArticlePublished => "article_published",
      Self::ArticleApproved => "article_approved",
      Self::ArticleRejected => "article_rejected",
      Self::Comment => "comment",
      Self::Mention => "mention",
      Self::System => "system",
      Self::Status => "status",
      Self::Other(s) => s,
    }
  }
}

impl From<String> for NotificationKind {
  fn from(s: String) -> Self {
    match s.as_str() {
      "article_published" => Self::ArticlePublished,
      "article_approved" => Self::ArticleApproved,
      "article_rejected" => Self::ArticleRejected,
      "comment" => Self::Comment,
      "mention" => Self::Mention,
      "system" => Self::System,
      "status" => Self::Status,
      _ => Self::Other(s),
    }
  }
}

impl From<NotificationKind> for String {
  fn from(k: NotificationKind) -> Self {
    match k {
      NotificationKind::Other(s) => s,
      known => known.as_str().to_owned(),
    }
  }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
  pub id:         Uuid,
  /// Receiver uid.
  pub uid:        String,
  pub message:    String,
  #[serde(rename = "type")]
  pub kind:       NotificationKind,
  pub read:       bool,
  pub created_at: DateTime<Utc>,
  pub article_id: Option<Uuid>,
}

/// Input to [`crate::store::DocumentStore::add_notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub uid:        String,
  pub message:    String,
  pub kind:       NotificationKind,
  pub article_id: Option<Uuid>,
}
