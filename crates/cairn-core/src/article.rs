//! Article types: the documents of the `articles` collection.
//!
//! Articles move through a review workflow (`pending` → `approved` or
//! `rejected`). The direction of that workflow is a convention of the
//! submission and review flows; nothing in this crate enforces it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where an article is in the review workflow.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

impl ArticleStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }
}

impl fmt::Display for ArticleStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ArticleStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "approved" => Ok(Self::Approved),
      "rejected" => Ok(Self::Rejected),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Article ─────────────────────────────────────────────────────────────────

/// A stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
  /// Store-assigned key.
  pub id:             Uuid,
  pub title:          String,
  /// Markdown source.
  pub content:        String,
  pub category:       String,
  /// Author uid.
  pub uid:            String,
  pub display_name:   Option<String>,
  /// Server-assigned on creation; never changes.
  pub created_at:     DateTime<Utc>,
  /// Server-assigned on every update.
  pub updated_at:     Option<DateTime<Utc>>,
  pub status:         ArticleStatus,
  #[serde(default)]
  pub is_featured:    bool,
  pub references:     Option<String>,
  pub summary:        Option<String>,
  pub image_url:      Option<String>,
  pub review_comment: Option<String>,
  pub reviewed_at:    Option<DateTime<Utc>>,
}

// ─── NewArticle ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::DocumentStore::add_article`].
/// `id` and `created_at` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
  pub title:        String,
  pub content:      String,
  pub category:     String,
  pub uid:          String,
  pub display_name: Option<String>,
  #[serde(default)]
  pub status:       ArticleStatus,
  #[serde(default)]
  pub is_featured:  bool,
  pub references:   Option<String>,
  pub summary:      Option<String>,
  pub image_url:    Option<String>,
}

impl NewArticle {
  /// A pending submission with all optional fields unset.
  pub fn submission(
    uid: impl Into<String>,
    title: impl Into<String>,
    content: impl Into<String>,
    category: impl Into<String>,
  ) -> Self {
    Self {
      title:        title.into(),
      content:      content.into(),
      category:     category.into(),
      uid:          uid.into(),
      display_name: None,
      status:       ArticleStatus::Pending,
      is_featured:  false,
      references:   None,
      summary:      None,
      image_url:    None,
    }
  }
}

// ─── ArticlePatch ────────────────────────────────────────────────────────────

/// A partial update. `None` fields are left untouched.
///
/// `updated_at` is always refreshed by the store. When `mark_reviewed` is set
/// the store also stamps `reviewed_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
  pub title:          Option<String>,
  pub content:        Option<String>,
  pub category:       Option<String>,
  pub display_name:   Option<String>,
  pub status:         Option<ArticleStatus>,
  pub is_featured:    Option<bool>,
  pub references:     Option<String>,
  pub summary:        Option<String>,
  pub image_url:      Option<String>,
  pub review_comment: Option<String>,
  #[serde(default)]
  pub mark_reviewed:  bool,
}

impl ArticlePatch {
  /// The patch a reviewer applies when approving or rejecting.
  pub fn review(status: ArticleStatus, comment: Option<String>) -> Self {
    Self {
      status: Some(status),
      review_comment: comment,
      mark_reviewed: true,
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.content.is_none()
      && self.category.is_none()
      && self.display_name.is_none()
      && self.status.is_none()
      && self.is_featured.is_none()
      && self.references.is_none()
      && self.summary.is_none()
      && self.image_url.is_none()
      && self.review_comment.is_none()
      && !self.mark_reviewed
  }

  /// Merge the caller-supplied fields into a local copy of an article.
  ///
  /// Server-assigned timestamps are not touched; they are only known after
  /// the next read.
  pub fn apply_to(&self, article: &mut Article) {
    if let Some(v) = &self.title {
      article.title = v.clone();
    }
    if let Some(v) = &self.content {
      article.content = v.clone();
    }
    if let Some(v) = &self.category {
      article.category = v.clone();
    }
    if let Some(v) = &self.display_name {
      article.display_name = Some(v.clone());
    }
    if let Some(v) = self.status {
      article.status = v;
    }
    if let Some(v) = self.is_featured {
      article.is_featured = v;
    }
    if let Some(v) = &self.references {
      article.references = Some(v.clone());
    }
    if let Some(v) = &self.summary {
      article.summary = Some(v.clone());
    }
    if let Some(v) = &self.image_url {
      article.image_url = Some(v.clone());
    }
    if let Some(v) = &self.review_comment {
      article.review_comment = Some(v.clone());
    }
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The article fields a query may be ordered by.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ArticleField {
  #[default]
  CreatedAt,
  UpdatedAt,
  ReviewedAt,
  Title,
  Category,
  Status,
}

impl FromStr for ArticleField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "createdAt" => Ok(Self::CreatedAt),
      "updatedAt" => Ok(Self::UpdatedAt),
      "reviewedAt" => Ok(Self::ReviewedAt),
      "title" => Ok(Self::Title),
      "category" => Ok(Self::Category),
      "status" => Ok(Self::Status),
      other => Err(Error::UnknownOrderField(other.to_owned())),
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Asc,
  #[default]
  Desc,
}

impl FromStr for Direction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      other => Err(Error::UnknownDirection(other.to_owned())),
    }
  }
}
