//! Client configuration.

use std::{path::Path, time::Duration};

use serde::Deserialize;

/// Runtime client configuration. Every field has a default, so an empty
/// file (or none at all) is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// Lifetime of a cached article page.
  pub cache_ttl_secs:        u64,
  /// `limit_count` used when a fetch doesn't specify one.
  pub default_page_size:     usize,
  /// How long an auth error stays visible before it clears itself.
  pub auth_error_ttl_secs:   u64,
  /// Shown when the signed-in user has no display name.
  pub display_name_fallback: String,
  /// Base URL of the callable functions service.
  pub functions_url:         Option<String>,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      cache_ttl_secs:        300,
      default_page_size:     10,
      auth_error_ttl_secs:   300,
      display_name_fallback: "Unknown user".to_owned(),
      functions_url:         None,
    }
  }
}

impl ClientConfig {
  /// Load from an optional TOML file, overridden by `CAIRN_`-prefixed
  /// environment variables.
  pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(false));
    }
    builder
      .add_source(config::Environment::with_prefix("CAIRN"))
      .build()?
      .try_deserialize()
  }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn auth_error_ttl(&self) -> Duration { Duration::from_secs(self.auth_error_ttl_secs) }
}
