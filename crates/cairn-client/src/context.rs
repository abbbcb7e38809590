//! The composition root: owns everything that would otherwise be a global.

use std::sync::Arc;

use cairn_core::store::DocumentStore;

use crate::{
  articles::ArticleRepository,
  auth::{AuthProvider, AuthSession},
  badges::{NotificationCenter, ReviewQueue},
  cache::ArticleCache,
  config::ClientConfig,
  error::ErrorLog,
  functions::{CallableError, FunctionsClient},
};

/// Application-wide client state.
///
/// Build one per process, call [`AppContext::init`] at start-up and
/// [`AppContext::dispose`] at shutdown. Everything handed out by the context
/// shares its article cache, error log and auth session.
pub struct AppContext<S, P> {
  store:     Arc<S>,
  cache:     Arc<ArticleCache>,
  errors:    Arc<ErrorLog>,
  auth:      Arc<AuthSession<P>>,
  functions: Option<FunctionsClient>,
  config:    ClientConfig,
}

impl<S: DocumentStore, P: AuthProvider> AppContext<S, P> {
  pub fn new(store: Arc<S>, provider: Arc<P>, config: ClientConfig) -> Result<Self, CallableError> {
    let errors = Arc::new(ErrorLog::default());
    let auth = Arc::new(AuthSession::new(
      provider,
      Arc::clone(&errors),
      config.display_name_fallback.clone(),
      config.auth_error_ttl(),
    ));
    let functions = config.functions_url.as_deref().map(FunctionsClient::new).transpose()?;
    Ok(Self {
      store,
      cache: Arc::new(ArticleCache::new(config.cache_ttl())),
      errors,
      auth,
      functions,
      config,
    })
  }

  /// Start the auth subscription. Safe to call more than once.
  pub async fn init(&self) {
    self.auth.initialize().await;
    tracing::debug!("client context initialised");
  }

  /// Stop the auth subscription and drop cached pages.
  pub fn dispose(&self) {
    self.auth.cleanup_auth();
    self.cache.invalidate_all();
    tracing::debug!("client context disposed");
  }

  pub fn articles(&self) -> ArticleRepository<S> {
    ArticleRepository::new(
      Arc::clone(&self.store),
      Arc::clone(&self.cache),
      Arc::clone(&self.errors),
      self.config.default_page_size,
    )
  }

  pub fn notifications(&self) -> NotificationCenter<S> {
    NotificationCenter::new(Arc::clone(&self.store), Arc::clone(&self.errors))
  }

  pub fn review_queue(&self) -> ReviewQueue<S> {
    ReviewQueue::new(Arc::clone(&self.store), Arc::clone(&self.errors))
  }

  pub fn auth(&self) -> &Arc<AuthSession<P>> { &self.auth }

  pub fn functions(&self) -> Option<&FunctionsClient> { self.functions.as_ref() }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn cache(&self) -> &Arc<ArticleCache> { &self.cache }

  pub fn errors(&self) -> &Arc<ErrorLog> { &self.errors }

  pub fn config(&self) -> &ClientConfig { &self.config }
}
