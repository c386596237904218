//! Tab-scoped authentication state.
//!
//! `AuthContext` is created once per tab by `AuthProvider` and handed to
//! everything that needs auth state. State lives in a `watch` channel and
//! every mutation is a single `send_modify`, so subscribers never observe
//! a user without its token or a half-finished transition.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};

use super::error::{AuthError, SessionError};
use super::notify::{Notification, Notifier};
use super::session::{AuthData, Session, User};
use super::store::SessionStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticating: bool,
}

impl AuthState {
    /// Derived from `user`; never stored on its own.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct Inner {
    store: SessionStore,
    api: Arc<dyn AuthApi>,
    notifier: Arc<dyn Notifier>,
    session_lifetime: Duration,
    state: watch::Sender<AuthState>,
}

#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    /// Build the context and hydrate it from the stored session, if any.
    /// An expired session is not hydrated.
    pub fn new(
        store: SessionStore,
        api: Arc<dyn AuthApi>,
        notifier: Arc<dyn Notifier>,
        session_lifetime: Duration,
    ) -> Self {
        let initial = match store.load() {
            // Left in the store so the expiry watcher can still revoke the
            // token on the server before clearing it.
            Some(session) if session.is_expired() => {
                debug!("Stored session has expired, starting logged out");
                AuthState::default()
            }
            Some(session) => {
                debug!("Hydrating auth state from stored session");
                let (token, user) = session.into_parts();
                AuthState {
                    user: Some(user),
                    token: Some(token),
                    is_authenticating: false,
                }
            }
            None => {
                debug!("No stored session");
                AuthState::default()
            }
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                store,
                api,
                notifier,
                session_lifetime,
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_authenticating(&self) -> bool {
        self.inner.state.borrow().is_authenticating
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    /// Set the user alone. Callers establishing a session must also call
    /// `set_token`; prefer `establish`.
    pub fn set_user(&self, user: Option<User>) {
        self.inner.state.send_modify(|state| state.user = user);
    }

    pub fn set_token(&self, token: Option<String>) {
        self.inner.state.send_modify(|state| state.token = token);
    }

    pub fn set_authenticating(&self, authenticating: bool) {
        self.inner
            .state
            .send_if_modified(|state| replace_flag(&mut state.is_authenticating, authenticating));
    }

    /// Flip `is_authenticating` on unless it already is. Returns whether
    /// this caller won the flag.
    pub(crate) fn try_begin_authenticating(&self) -> bool {
        self.inner
            .state
            .send_if_modified(|state| replace_flag(&mut state.is_authenticating, true))
    }

    /// Persist `session` and publish its user and token in one update.
    pub fn establish(&self, session: Session) -> Result<(), AuthError> {
        self.inner.store.save(&session)?;

        let (token, user) = session.into_parts();
        info!(email = %user.email, provider = ?user.provider, "Session established");
        self.inner.state.send_modify(|state| {
            state.user = Some(user);
            state.token = Some(token);
            state.is_authenticating = false;
        });
        Ok(())
    }

    /// Turn a completed handshake into a persisted session.
    pub fn handle_oauth_callback(&self, data: AuthData) -> Result<Session, AuthError> {
        let session = data.into_session(self.inner.session_lifetime)?;
        self.establish(session.clone())?;
        Ok(session)
    }

    /// Log in with email and password against the auth server.
    pub async fn login_with_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if !self.try_begin_authenticating() {
            return Err(AuthError::LoginInProgress);
        }

        let result = self.credential_login(email, password).await;
        self.set_authenticating(false);

        match result {
            Ok(user) => {
                self.notify(Notification::success(format!("Signed in as {}", user.name)));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Credential login failed");
                self.notify(Notification::error(login_error_message(&e)));
                Err(e)
            }
        }
    }

    async fn credential_login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let response = self.inner.api.login(email, password).await?;
        let lifetime = match response.expires_in {
            Some(secs) => Duration::try_seconds(secs).ok_or(SessionError::ExpiryOutOfRange)?,
            None => self.inner.session_lifetime,
        };
        let session = AuthData {
            token: response.token,
            user: response.user,
        }
        .into_session(lifetime)?;

        let user = session.user().clone();
        self.establish(session)?;
        Ok(user)
    }

    /// Log out: invalidate the server session when possible, then always
    /// clear local state.
    ///
    /// The returned error only reports the server call; local state is
    /// cleared either way.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.end_session().await;
        match &result {
            Ok(()) => self.notify(Notification::success("Logged out successfully")),
            Err(e) => self.notify(Notification::error(format!(
                "Logged out locally, but the server could not be reached: {}",
                e
            ))),
        }
        result
    }

    /// Logout triggered by the expiry watcher.
    pub(crate) async fn expire(&self) {
        if let Err(e) = self.end_session().await {
            debug!(error = %e, "Server logout failed for expired session");
        }
        self.notify(Notification::warning(
            "Your session has expired. Please log in again.",
        ));
    }

    async fn end_session(&self) -> Result<(), ApiError> {
        let token = self
            .token()
            .or_else(|| self.inner.store.load().map(|s| s.token().to_string()));

        let result = match token {
            Some(token) => self.inner.api.logout(&token).await,
            None => Ok(()),
        };
        if let Err(ref e) = result {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }

        self.clear_local();
        result
    }

    /// Drop the session locally without contacting the server.
    pub fn clear_local(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        self.inner.state.send_modify(|state| *state = AuthState::default());
    }
}

fn replace_flag(flag: &mut bool, value: bool) -> bool {
    let changed = *flag != value;
    *flag = value;
    changed
}

fn login_error_message(error: &AuthError) -> String {
    match error {
        AuthError::Api(ApiError::Unauthorized) => "Invalid email or password".to_string(),
        AuthError::Api(ApiError::Network(e)) if e.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        AuthError::Api(ApiError::Network(_)) => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        other => format!("Login failed: {}", other),
    }
}
