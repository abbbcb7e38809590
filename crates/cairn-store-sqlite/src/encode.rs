//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical and chronological order agree.
//! Claims are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use cairn_core::{
  article::{Article, ArticleField, ArticleStatus, Direction},
  auth::{AuthUser, CustomClaims},
  notification::{NotificationKind, NotificationMessage},
  user::UserProfile,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Ordering ─────────────────────────────────────────────────────────────────

/// The column an [`ArticleField`] orders by. Only these literals are ever
/// interpolated into SQL.
pub fn order_column(field: ArticleField) -> &'static str {
  match field {
    ArticleField::CreatedAt => "created_at",
    ArticleField::UpdatedAt => "updated_at",
    ArticleField::ReviewedAt => "reviewed_at",
    ArticleField::Title => "title",
    ArticleField::Category => "category",
    ArticleField::Status => "status",
  }
}

pub fn order_keyword(direction: Direction) -> &'static str {
  match direction {
    Direction::Asc => "ASC",
    Direction::Desc => "DESC",
  }
}

// ─── Claims ───────────────────────────────────────────────────────────────────

pub fn encode_claims(claims: &CustomClaims) -> Result<String> {
  Ok(serde_json::to_string(claims)?)
}

pub fn decode_claims(s: &str) -> Result<CustomClaims> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ARTICLE_COLUMNS: &str = "id, title, content, category, uid, display_name, \
   created_at, updated_at, status, is_featured, refs, summary, image_url, \
   review_comment, reviewed_at";

/// Raw values read directly from an `articles` row.
pub struct RawArticle {
  pub id:             String,
  pub title:          String,
  pub content:        String,
  pub category:       String,
  pub uid:            String,
  pub display_name:   Option<String>,
  pub created_at:     String,
  pub updated_at:     Option<String>,
  pub status:         String,
  pub is_featured:    bool,
  pub refs:           Option<String>,
  pub summary:        Option<String>,
  pub image_url:      Option<String>,
  pub review_comment: Option<String>,
  pub reviewed_at:    Option<String>,
}

impl RawArticle {
  /// Map a row selected with [`ARTICLE_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      title:          row.get(1)?,
      content:        row.get(2)?,
      category:       row.get(3)?,
      uid:            row.get(4)?,
      display_name:   row.get(5)?,
      created_at:     row.get(6)?,
      updated_at:     row.get(7)?,
      status:         row.get(8)?,
      is_featured:    row.get(9)?,
      refs:           row.get(10)?,
      summary:        row.get(11)?,
      image_url:      row.get(12)?,
      review_comment: row.get(13)?,
      reviewed_at:    row.get(14)?,
    })
  }

  pub fn into_article(self) -> Result<Article> {
    Ok(Article {
      id:             decode_uuid(&self.id)?,
      title:          self.title,
      content:        self.content,
      category:       self.category,
      uid:            self.uid,
      display_name:   self.display_name,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_opt_dt(self.updated_at)?,
      status:         self.status.parse::<ArticleStatus>()?,
      is_featured:    self.is_featured,
      references:     self.refs,
      summary:        self.summary,
      image_url:      self.image_url,
      review_comment: self.review_comment,
      reviewed_at:    decode_opt_dt(self.reviewed_at)?,
    })
  }
}

pub const USER_COLUMNS: &str = "id, display_name, email, photo_url, is_admin";

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
  Ok(UserProfile {
    id:           row.get(0)?,
    display_name: row.get(1)?,
    email:        row.get(2)?,
    photo_url:    row.get(3)?,
    is_admin:     row.get(4)?,
  })
}

pub const NOTIFICATION_COLUMNS: &str =
  "id, uid, message, kind, read, created_at, article_id";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub id:         String,
  pub uid:        String,
  pub message:    String,
  pub kind:       String,
  pub read:       bool,
  pub created_at: String,
  pub article_id: Option<String>,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      uid:        row.get(1)?,
      message:    row.get(2)?,
      kind:       row.get(3)?,
      read:       row.get(4)?,
      created_at: row.get(5)?,
      article_id: row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<NotificationMessage> {
    Ok(NotificationMessage {
      id:         decode_uuid(&self.id)?,
      uid:        self.uid,
      message:    self.message,
      kind:       NotificationKind::from(self.kind),
      read:       self.read,
      created_at: decode_dt(&self.created_at)?,
      article_id: self.article_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str = "uid, display_name, email, photo_url, claims";

/// Raw values read from an `accounts` row (password hash excluded).
pub struct RawAccount {
  pub uid:          String,
  pub display_name: Option<String>,
  pub email:        String,
  pub photo_url:    Option<String>,
  pub claims:       String,
}

impl RawAccount {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:          row.get(0)?,
      display_name: row.get(1)?,
      email:        row.get(2)?,
      photo_url:    row.get(3)?,
      claims:       row.get(4)?,
    })
  }

  pub fn into_auth_user(self) -> Result<AuthUser> {
    Ok(AuthUser {
      uid:          self.uid,
      display_name: self.display_name,
      email:        Some(self.email),
      photo_url:    self.photo_url,
      claims:       decode_claims(&self.claims)?,
    })
  }
}
