//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::{
  path::Path,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, DurationRound as _, TimeDelta, Utc};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use uuid::Uuid;

use cairn_core::{
  article::{Article, ArticlePatch, NewArticle},
  notification::{NewNotification, NotificationMessage},
  store::{ArticleFilter, ArticleQuery, DocumentStore},
  user::{UserPatch, UserProfile},
};

use crate::{
  Error, Result,
  encode::{
    ARTICLE_COLUMNS, NOTIFICATION_COLUMNS, RawArticle, RawNotification,
    USER_COLUMNS, encode_dt, encode_uuid, order_column, order_keyword,
    user_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cairn document store (and auth service) backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and clock are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  last_timestamp:  Arc<Mutex<DateTime<Utc>>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      last_timestamp: Arc::new(Mutex::new(DateTime::<Utc>::MIN_UTC)),
    })
  }

  /// A server timestamp strictly greater than every one handed out before by
  /// this store, at the microsecond precision the columns keep.
  pub(crate) fn server_timestamp(&self) -> DateTime<Utc> {
    let tick = TimeDelta::microseconds(1);
    let now = Utc::now().duration_trunc(tick).unwrap_or_else(|_| Utc::now());
    let mut last = self
      .last_timestamp
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let next = if now > *last { now } else { *last + tick };
    *last = next;
    next
  }

  async fn write_article(&self, article: &Article) -> Result<()> {
    let params = vec![
      Value::Text(encode_uuid(article.id)),
      Value::Text(article.title.clone()),
      Value::Text(article.content.clone()),
      Value::Text(article.category.clone()),
      Value::Text(article.uid.clone()),
      opt_text(article.display_name.clone()),
      Value::Text(encode_dt(article.created_at)),
      opt_text(article.updated_at.map(encode_dt)),
      Value::Text(article.status.as_str().to_owned()),
      Value::Integer(i64::from(article.is_featured)),
      opt_text(article.references.clone()),
      opt_text(article.summary.clone()),
      opt_text(article.image_url.clone()),
      opt_text(article.review_comment.clone()),
      opt_text(article.reviewed_at.map(encode_dt)),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT OR REPLACE INTO articles ({ARTICLE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
          ),
          params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user_row(&self, uid: &str) -> Result<Option<UserProfile>> {
    let uid = uid.to_owned();
    let user = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![uid],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(user)
  }
}

fn opt_text(value: Option<String>) -> Value {
  value.map(Value::Text).unwrap_or(Value::Null)
}

/// Build a `WHERE` clause (possibly empty) and its positional parameters.
fn filter_clause(filter: &ArticleFilter) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = vec![];
  let mut params: Vec<Value> = vec![];

  if let Some(status) = filter.status {
    params.push(Value::Text(status.as_str().to_owned()));
    conds.push(format!("status = ?{}", params.len()));
  }
  if let Some(category) = &filter.category {
    params.push(Value::Text(category.clone()));
    conds.push(format!("category = ?{}", params.len()));
  }
  if let Some(uid) = &filter.uid {
    params.push(Value::Text(uid.clone()));
    conds.push(format!("uid = ?{}", params.len()));
  }
  if let Some(featured) = filter.featured {
    params.push(Value::Integer(i64::from(featured)));
    conds.push(format!("is_featured = ?{}", params.len()));
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, params)
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Articles ──────────────────────────────────────────────────────────────

  async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
    let (where_clause, mut params) = filter_clause(&query.filter);
    let mut sql = format!(
      "SELECT {ARTICLE_COLUMNS} FROM articles {where_clause} ORDER BY {col} {dir}, id {dir}",
      col = order_column(query.order_by),
      dir = order_keyword(query.direction),
    );
    if let Some(limit) = query.limit {
      params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
      sql.push_str(&format!(" LIMIT ?{}", params.len()));
    }

    let raws: Vec<RawArticle> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), RawArticle::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArticle::into_article).collect()
  }

  async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64> {
    let (where_clause, params) = filter_clause(filter);
    let sql = format!("SELECT COUNT(*) FROM articles {where_clause}");

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, params_from_iter(params), |r| r.get(0))?)
      })
      .await?;

    Ok(u64::try_from(count).unwrap_or(0))
  }

  async fn get_article(&self, id: Uuid) -> Result<Option<Article>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawArticle> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
              rusqlite::params![id_str],
              RawArticle::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawArticle::into_article).transpose()
  }

  async fn add_article(&self, input: NewArticle) -> Result<Article> {
    let article = Article {
      id:             Uuid::new_v4(),
      title:          input.title,
      content:        input.content,
      category:       input.category,
      uid:            input.uid,
      display_name:   input.display_name,
      created_at:     self.server_timestamp(),
      updated_at:     None,
      status:         input.status,
      is_featured:    input.is_featured,
      references:     input.references,
      summary:        input.summary,
      image_url:      input.image_url,
      review_comment: None,
      reviewed_at:    None,
    };

    self.write_article(&article).await?;
    Ok(article)
  }

  async fn update_article(&self, id: Uuid, patch: ArticlePatch) -> Result<()> {
    let mut article = self.get_article(id).await?.ok_or_else(|| {
      Error::NotFound { collection: "articles", id: id.to_string() }
    })?;

    patch.apply_to(&mut article);
    let now = self.server_timestamp();
    article.updated_at = Some(now);
    if patch.mark_reviewed {
      article.reviewed_at = Some(now);
    }

    self.write_article(&article).await
  }

  async fn delete_article(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM articles WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>> {
    self.get_user_row(uid).await
  }

  async fn list_users(&self) -> Result<Vec<UserProfile>> {
    let users = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt
          .query_map([], user_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(users)
  }

  async fn merge_user(&self, uid: &str, patch: UserPatch) -> Result<UserProfile> {
    let uid_owned = uid.to_owned();
    let is_admin = patch.is_admin.map(i64::from);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (id, display_name, email, photo_url, is_admin)
           VALUES (?1, ?2, ?3, ?4, COALESCE(?5, 0))
           ON CONFLICT(id) DO UPDATE SET
             display_name = COALESCE(?2, display_name),
             email        = COALESCE(?3, email),
             photo_url    = COALESCE(?4, photo_url),
             is_admin     = COALESCE(?5, is_admin)",
          rusqlite::params![
            uid_owned,
            patch.display_name,
            patch.email,
            patch.photo_url,
            is_admin,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.get_user_row(uid).await?.ok_or_else(|| Error::NotFound {
      collection: "users",
      id:         uid.to_owned(),
    })
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn add_notification(
    &self,
    input: NewNotification,
  ) -> Result<NotificationMessage> {
    let notification = NotificationMessage {
      id:         Uuid::new_v4(),
      uid:        input.uid,
      message:    input.message,
      kind:       input.kind,
      read:       false,
      created_at: self.server_timestamp(),
      article_id: input.article_id,
    };

    let params = vec![
      Value::Text(encode_uuid(notification.id)),
      Value::Text(notification.uid.clone()),
      Value::Text(notification.message.clone()),
      Value::Text(notification.kind.as_str().to_owned()),
      Value::Integer(0),
      Value::Text(encode_dt(notification.created_at)),
      opt_text(notification.article_id.map(encode_uuid)),
    ];

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          ),
          params_from_iter(params),
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn list_notifications(
    &self,
    uid: &str,
    read: Option<bool>,
    limit: Option<usize>,
  ) -> Result<Vec<NotificationMessage>> {
    let uid = uid.to_owned();
    let read = read.map(i64::from);
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE uid = ?1 AND (?2 IS NULL OR read = ?2)
           ORDER BY created_at DESC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![uid, read, limit], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn count_notifications(&self, uid: &str, read: Option<bool>) -> Result<u64> {
    let uid = uid.to_owned();
    let read = read.map(i64::from);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM notifications WHERE uid = ?1 AND (?2 IS NULL OR read = ?2)",
          rusqlite::params![uid, read],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(u64::try_from(count).unwrap_or(0))
  }

  async fn mark_notification_read(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET read = 1 WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound {
        collection: "notifications",
        id:         id.to_string(),
      });
    }
    Ok(())
  }
}
