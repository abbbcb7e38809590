//! Shared authentication state.
//!
//! An [`AuthProvider`] publishes the signed-in user as a stream of events.
//! [`AuthSession`] subscribes to it exactly once, however many callers ask
//! it to, and keeps the derived state every view reads.

use std::{
  future::Future,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use cairn_core::{
  ErrorCode,
  auth::{AuthService, AuthUser},
};
use tokio::{
  sync::{OnceCell, watch},
  task::JoinHandle,
};

use crate::error::{AppError, ErrorLog};

/// One upstream state change: the current user (if any), or a listener
/// error.
pub type AuthEvent = Result<Option<AuthUser>, AppError>;

/// Source of auth state changes.
pub trait AuthProvider: Send + Sync + 'static {
  type Error: std::error::Error + ErrorCode + Send + Sync + 'static;

  /// A receiver whose current value is the latest event.
  fn subscribe(&self) -> watch::Receiver<AuthEvent>;

  /// Re-resolve the current session and publish the result.
  fn reload(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── SessionAuthProvider ─────────────────────────────────────────────────────

/// An [`AuthProvider`] over an [`AuthService`], holding the bearer token of
/// the signed-in session.
pub struct SessionAuthProvider<A> {
  service: Arc<A>,
  token:   Mutex<Option<String>>,
  events:  watch::Sender<AuthEvent>,
}

impl<A: AuthService> SessionAuthProvider<A> {
  pub fn new(service: Arc<A>) -> Self {
    Self { service, token: Mutex::new(None), events: watch::Sender::new(Ok(None)) }
  }

  pub async fn sign_in_with_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<AuthUser, A::Error> {
    let session = self.service.sign_in_with_password(email, password).await?;
    *self.lock_token() = Some(session.token);
    tracing::info!(uid = %session.user.uid, "signed in");
    self.events.send_replace(Ok(Some(session.user.clone())));
    Ok(session.user)
  }

  pub async fn sign_out(&self) -> Result<(), A::Error> {
    let token = self.lock_token().take();
    if let Some(token) = token {
      self.service.sign_out(&token).await?;
    }
    self.events.send_replace(Ok(None));
    Ok(())
  }

  /// The bearer token of the current session, for authenticated calls.
  pub fn current_token(&self) -> Option<String> { self.lock_token().clone() }

  fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<String>> {
    self.token.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<A: AuthService + 'static> AuthProvider for SessionAuthProvider<A> {
  type Error = A::Error;

  fn subscribe(&self) -> watch::Receiver<AuthEvent> { self.events.subscribe() }

  async fn reload(&self) -> Result<(), Self::Error> {
    let Some(token) = self.current_token() else {
      self.events.send_replace(Ok(None));
      return Ok(());
    };
    match self.service.verify_token(&token).await {
      Ok(Some(user)) => {
        self.events.send_replace(Ok(Some(user)));
        Ok(())
      }
      Ok(None) => {
        tracing::info!("session no longer valid");
        *self.lock_token() = None;
        self.events.send_replace(Ok(None));
        Ok(())
      }
      Err(err) => {
        let error = AppError::from_backend(&err, Some("Failed to check the sign-in state"))
          .with_context("auth");
        self.events.send_replace(Err(error));
        Err(err)
      }
    }
  }
}

// ─── AuthSession ─────────────────────────────────────────────────────────────

/// The shared auth state record.
#[derive(Debug, Clone)]
pub struct AuthState {
  pub user:           Option<AuthUser>,
  pub is_loading:     bool,
  /// Compared by identity when the auto-clear fires.
  pub error:          Option<Arc<AppError>>,
  pub is_initialized: bool,
}

impl Default for AuthState {
  fn default() -> Self {
    Self { user: None, is_loading: true, error: None, is_initialized: false }
  }
}

/// Process-wide auth state, fed by a single provider subscription.
pub struct AuthSession<P> {
  provider:         Arc<P>,
  state:            Arc<watch::Sender<AuthState>>,
  errors:           Arc<ErrorLog>,
  init:             OnceCell<()>,
  listener:         Mutex<Option<JoinHandle<()>>>,
  display_fallback: String,
  error_ttl:        Duration,
}

impl<P: AuthProvider> AuthSession<P> {
  pub fn new(
    provider: Arc<P>,
    errors: Arc<ErrorLog>,
    display_fallback: impl Into<String>,
    error_ttl: Duration,
  ) -> Self {
    Self {
      provider,
      state: Arc::new(watch::Sender::new(AuthState::default())),
      errors,
      init: OnceCell::new(),
      listener: Mutex::new(None),
      display_fallback: display_fallback.into(),
      error_ttl,
    }
  }

  pub fn provider(&self) -> &Arc<P> { &self.provider }

  /// Subscribe to the provider. Repeated and concurrent calls share the
  /// first call's work; only one listener is ever started.
  pub async fn initialize(&self) {
    self
      .init
      .get_or_init(|| async {
        let mut events = self.provider.subscribe();
        let updater = StateUpdater {
          state:     Arc::clone(&self.state),
          errors:    Arc::clone(&self.errors),
          error_ttl: self.error_ttl,
        };
        updater.apply(events.borrow_and_update().clone());

        let handle = tokio::spawn(async move {
          while events.changed().await.is_ok() {
            let event = events.borrow_and_update().clone();
            updater.apply(event);
          }
          tracing::debug!("auth provider closed");
        });
        *self.lock_listener() = Some(handle);
        tracing::debug!("auth listener started");
      })
      .await;
  }

  // ── Derived state ─────────────────────────────────────────────────────

  pub fn state(&self) -> AuthState { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<AuthState> { self.state.subscribe() }

  pub fn current_user(&self) -> Option<AuthUser> { self.state.borrow().user.clone() }

  pub fn is_loading(&self) -> bool { self.state.borrow().is_loading }

  pub fn is_initialized(&self) -> bool { self.state.borrow().is_initialized }

  pub fn auth_error(&self) -> Option<Arc<AppError>> { self.state.borrow().error.clone() }

  /// True only once initialised and with a user present.
  pub fn is_authenticated(&self) -> bool {
    let state = self.state.borrow();
    state.is_initialized && state.user.is_some()
  }

  pub fn display_name(&self) -> String {
    self
      .state
      .borrow()
      .user
      .as_ref()
      .and_then(|u| u.display_name.clone())
      .filter(|name| !name.is_empty())
      .unwrap_or_else(|| self.display_fallback.clone())
  }

  pub fn email(&self) -> String {
    self.state.borrow().user.as_ref().and_then(|u| u.email.clone()).unwrap_or_default()
  }

  pub fn uid(&self) -> String {
    self.state.borrow().user.as_ref().map(|u| u.uid.clone()).unwrap_or_default()
  }

  pub fn photo_url(&self) -> Option<String> {
    self.state.borrow().user.as_ref().and_then(|u| u.photo_url.clone())
  }

  pub fn is_admin(&self) -> bool {
    self.state.borrow().user.as_ref().is_some_and(AuthUser::is_admin)
  }

  pub fn is_current_user(&self, uid: &str) -> bool {
    self.state.borrow().user.as_ref().is_some_and(|u| u.uid == uid)
  }

  // ── Actions ───────────────────────────────────────────────────────────

  pub fn clear_auth_error(&self) {
    self.state.send_if_modified(|s| s.error.take().is_some());
  }

  /// Ask the provider to reload the session. On success the state reflects
  /// the reloaded session when this returns.
  pub async fn refresh_auth(&self) -> Result<(), P::Error> {
    self.provider.reload().await?;
    let event = self.provider.subscribe().borrow().clone();
    if let Ok(user) = event {
      self.state.send_modify(|s| {
        s.user = user;
        s.is_loading = false;
        s.error = None;
        s.is_initialized = true;
      });
    }
    Ok(())
  }

  /// Stop listening to the provider. Meant for application shutdown only:
  /// initialisation stays done, so a later [`AuthSession::initialize`] does
  /// not subscribe again and the state stays as it was at cleanup.
  pub fn cleanup_auth(&self) {
    if let Some(handle) = self.lock_listener().take() {
      handle.abort();
      tracing::debug!("auth listener stopped");
    }
  }

  fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    self.listener.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<P> Drop for AuthSession<P> {
  fn drop(&mut self) {
    if let Some(handle) = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
      handle.abort();
    }
  }
}

/// Applies provider events to the shared state from the listener task.
struct StateUpdater {
  state:     Arc<watch::Sender<AuthState>>,
  errors:    Arc<ErrorLog>,
  error_ttl: Duration,
}

impl StateUpdater {
  fn apply(&self, event: AuthEvent) {
    match event {
      Ok(user) => self.state.send_modify(|s| {
        s.user = user;
        s.is_loading = false;
        s.error = None;
        s.is_initialized = true;
      }),
      Err(error) => {
        let error = Arc::new(self.errors.report(error));
        self.state.send_modify(|s| {
          s.user = None;
          s.is_loading = false;
          s.error = Some(Arc::clone(&error));
          s.is_initialized = true;
        });
        self.schedule_clear(error);
      }
    }
  }

  /// Clear `error` after the TTL unless something else replaced it first.
  fn schedule_clear(&self, error: Arc<AppError>) {
    let state = Arc::clone(&self.state);
    let after = self.error_ttl;
    tokio::spawn(async move {
      tokio::time::sleep(after).await;
      state.send_if_modified(|s| match &s.error {
        Some(current) if Arc::ptr_eq(current, &error) => {
          s.error = None;
          true
        }
        _ => false,
      });
    });
  }
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use super::*;

  struct ManualProvider {
    events: watch::Sender<AuthEvent>,
  }

  impl ManualProvider {
    fn new() -> Arc<Self> { Arc::new(Self { events: watch::Sender::new(Ok(None)) }) }

    fn emit(&self, event: AuthEvent) { self.events.send_replace(event); }
  }

  impl AuthProvider for ManualProvider {
    type Error = Infallible;

    fn subscribe(&self) -> watch::Receiver<AuthEvent> { self.events.subscribe() }

    async fn reload(&self) -> Result<(), Infallible> { Ok(()) }
  }

  fn user(uid: &str, display_name: Option<&str>) -> AuthUser {
    AuthUser {
      uid:          uid.into(),
      display_name: display_name.map(Into::into),
      email:        Some(format!("{uid}@example.com")),
      photo_url:    None,
      claims:       Default::default(),
    }
  }

  fn session(provider: &Arc<ManualProvider>) -> AuthSession<ManualProvider> {
    AuthSession::new(
      Arc::clone(provider),
      Arc::new(ErrorLog::default()),
      "Unknown user",
      Duration::from_secs(300),
    )
  }

  async fn wait_for_error(s: &AuthSession<ManualProvider>, code: &str) {
    s.subscribe()
      .wait_for(|st| st.error.as_ref().is_some_and(|e| e.code == code))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn authenticated_only_after_init_with_user() {
    let provider = ManualProvider::new();
    provider.emit(Ok(Some(user("u1", None))));
    let s = session(&provider);
    assert!(!s.is_authenticated());
    assert!(s.is_loading());

    s.initialize().await;
    assert!(s.is_authenticated());
    assert!(s.is_current_user("u1"));
    assert!(!s.is_current_user("u2"));

    provider.emit(Ok(None));
    s.subscribe().wait_for(|st| st.user.is_none()).await.unwrap();
    assert!(!s.is_authenticated());
    assert!(s.is_initialized());
  }

  #[tokio::test]
  async fn initialized_without_user_is_not_authenticated() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    s.initialize().await;
    assert!(s.is_initialized());
    assert!(!s.is_authenticated());
    assert_eq!(s.uid(), "");
    assert_eq!(s.email(), "");
  }

  #[tokio::test]
  async fn initialize_is_idempotent_under_concurrency() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    tokio::join!(s.initialize(), s.initialize(), s.initialize());
    // Only the listener holds a receiver.
    assert_eq!(provider.events.receiver_count(), 1);
  }

  #[tokio::test]
  async fn display_name_falls_back() {
    let provider = ManualProvider::new();
    provider.emit(Ok(Some(user("u1", Some("")))));
    let s = session(&provider);
    s.initialize().await;
    assert_eq!(s.display_name(), "Unknown user");

    provider.emit(Ok(Some(user("u1", Some("Ada")))));
    s.subscribe()
      .wait_for(|st| st.user.as_ref().is_some_and(|u| u.display_name.is_some()))
      .await
      .unwrap();
    assert_eq!(s.display_name(), "Ada");
  }

  #[tokio::test(start_paused = true)]
  async fn listener_error_auto_clears_after_ttl() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    s.initialize().await;

    provider.emit(Err(AppError::new("unavailable", "stream dropped", "offline")));
    wait_for_error(&s, "unavailable").await;
    assert!(s.current_user().is_none());

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert!(s.auth_error().is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(s.auth_error().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn replaced_error_is_not_cleared_by_stale_timer() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    s.initialize().await;

    provider.emit(Err(AppError::new("first", "m", "u")));
    wait_for_error(&s, "first").await;

    tokio::time::sleep(Duration::from_secs(100)).await;
    provider.emit(Err(AppError::new("second", "m", "u")));
    wait_for_error(&s, "second").await;

    // The first error's timer fires at 300s and must leave "second" alone.
    tokio::time::sleep(Duration::from_secs(201)).await;
    assert_eq!(s.auth_error().map(|e| e.code.clone()).as_deref(), Some("second"));

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert!(s.auth_error().is_none());
  }

  #[tokio::test]
  async fn clear_auth_error_and_cleanup() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    s.initialize().await;

    provider.emit(Err(AppError::new("unavailable", "m", "u")));
    wait_for_error(&s, "unavailable").await;
    s.clear_auth_error();
    assert!(s.auth_error().is_none());

    s.cleanup_auth();
    provider.emit(Ok(Some(user("u1", None))));
    tokio::task::yield_now().await;
    assert!(!s.is_authenticated());
  }

  #[tokio::test]
  async fn initialize_after_cleanup_does_not_resubscribe() {
    let provider = ManualProvider::new();
    let s = session(&provider);
    s.initialize().await;
    s.cleanup_auth();

    s.initialize().await;
    provider.emit(Ok(Some(user("u1", None))));
    tokio::task::yield_now().await;
    assert!(s.is_initialized());
    assert!(!s.is_authenticated());
    assert!(s.lock_listener().is_none());
  }
}
