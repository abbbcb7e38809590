//! User profiles: the documents of the `users` collection.

use serde::{Deserialize, Serialize};

/// A profile document keyed by auth uid.
///
/// `is_admin` mirrors the `admin` custom claim held by the auth service. The
/// role functions are the only sanctioned writers of both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id:           String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  #[serde(rename = "photoURL")]
  pub photo_url:    Option<String>,
  #[serde(default)]
  pub is_admin:     bool,
}

/// A merge update for a profile document. Absent fields keep their stored
/// value; a missing document is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
  pub display_name: Option<String>,
  pub email:        Option<String>,
  #[serde(rename = "photoURL")]
  pub photo_url:    Option<String>,
  pub is_admin:     Option<bool>,
}

impl UserPatch {
  pub fn admin(is_admin: bool) -> Self {
    Self { is_admin: Some(is_admin), ..Self::default() }
  }
}
