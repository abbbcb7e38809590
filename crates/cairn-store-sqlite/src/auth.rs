//! [`AuthService`] implementation: accounts, sessions and custom claims.
//!
//! Passwords are stored as argon2 PHC strings. Session tokens are 32 random
//! bytes, handed out base64url-encoded; only their SHA-256 digest is stored.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use cairn_core::auth::{AuthService, AuthUser, CustomClaims, NewAccount, Session};
use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::{
  Error, Result, SqliteStore,
  encode::{ACCOUNT_COLUMNS, RawAccount, encode_claims, encode_dt},
};

const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> Result<()> {
  let parsed = PasswordHash::new(phc).map_err(|e| Error::PasswordHash(e.to_string()))?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| Error::InvalidCredentials)
}

impl SqliteStore {
  async fn account_by(&self, column: &'static str, value: String) -> Result<Option<AuthUser>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1"),
              rusqlite::params![value],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAccount::into_auth_user).transpose()
  }
}

impl AuthService for SqliteStore {
  type Error = Error;

  /// Registers the account and mirrors its public fields into the `users`
  /// collection, the way the sign-up flow does.
  async fn create_account(&self, input: NewAccount) -> Result<AuthUser> {
    let email = normalize_email(&input.email);
    if !email.contains('@') {
      return Err(Error::InvalidEmail(input.email));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::WeakPassword(MIN_PASSWORD_LEN));
    }
    if self.account_by("email", email.clone()).await?.is_some() {
      return Err(Error::EmailAlreadyInUse(email));
    }

    let user = AuthUser {
      uid:          Uuid::new_v4().simple().to_string(),
      display_name: input.display_name,
      email:        Some(email.clone()),
      photo_url:    input.photo_url,
      claims:       CustomClaims::default(),
    };

    let password_hash = hash_password(&input.password)?;
    let claims = encode_claims(&user.claims)?;
    let created_at = encode_dt(self.server_timestamp());
    let (uid, display_name, photo_url) =
      (user.uid.clone(), user.display_name.clone(), user.photo_url.clone());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO accounts
             (uid, email, password_hash, display_name, photo_url, claims, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            uid, email, password_hash, display_name, photo_url, claims, created_at,
          ],
        )?;
        tx.execute(
          "INSERT INTO users (id, display_name, email, photo_url, is_admin)
           VALUES (?1, ?2, ?3, ?4, 0)
           ON CONFLICT(id) DO NOTHING",
          rusqlite::params![uid, display_name, email, photo_url],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(uid = %user.uid, "account created");
    Ok(user)
  }

  async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
    let email = normalize_email(email);
    let lookup = email.clone();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uid, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![lookup],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let (uid, phc) = row.ok_or_else(|| Error::AccountNotFound(email.clone()))?;
    verify_password(password, &phc)?;

    let token = new_token();
    let token_hash = hash_token(&token);
    let issued_at = encode_dt(self.server_timestamp());
    let session_uid = uid.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, uid, issued_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_hash, session_uid, issued_at],
        )?;
        Ok(())
      })
      .await?;

    let user = self
      .account_by("uid", uid.clone())
      .await?
      .ok_or(Error::AccountNotFound(uid))?;
    Ok(Session { token, user })
  }

  async fn verify_token(&self, token: &str) -> Result<Option<AuthUser>> {
    let token_hash = hash_token(token);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.uid, a.display_name, a.email, a.photo_url, a.claims
               FROM sessions s
               JOIN accounts a ON a.uid = s.uid
               WHERE s.token_hash = ?1",
              rusqlite::params![token_hash],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_auth_user).transpose()
  }

  async fn sign_out(&self, token: &str) -> Result<()> {
    let token_hash = hash_token(token);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_account(&self, uid: &str) -> Result<Option<AuthUser>> {
    self.account_by("uid", uid.to_owned()).await
  }

  async fn set_custom_claims(&self, uid: &str, claims: CustomClaims) -> Result<()> {
    let encoded = encode_claims(&claims)?;
    let uid_owned = uid.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET claims = ?1 WHERE uid = ?2",
          rusqlite::params![encoded, uid_owned],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::AccountNotFound(uid.to_owned()));
    }
    Ok(())
  }
}
