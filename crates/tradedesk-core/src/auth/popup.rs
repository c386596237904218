//! OAuth popup coordination.
//!
//! A login opens the identity provider in a centered popup and then waits
//! for whichever happens first:
//!
//! ```text
//! start_login ──→ open popup ──┬── AUTH_SUCCESS from own origin ──→ Authenticated
//!                              ├── AUTH_ERROR from own origin   ──→ Err(Provider)
//!                              ├── popup closed (poll)          ──→ Cancelled
//!                              └── timeout                      ──→ Err(TimedOut)
//! ```
//!
//! The wait is a single future, so the first outcome ends it and nothing
//! fires afterwards. The message listener and poll timer live inside that
//! future; dropping it (component teardown) removes both and clears
//! `is_authenticating`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::context::AuthContext;
use super::error::AuthError;
use super::message::{AuthMessage, MessageEvent};
use super::notify::Notification;
use super::session::User;
use super::window::{PopupFeatures, PopupHandle, WindowHost};

#[derive(Debug, Clone)]
pub struct PopupConfig {
    pub width: i32,
    pub height: i32,
    pub poll_interval: Duration,
    /// Give up waiting after this long. `None` waits until the popup closes.
    pub timeout: Option<Duration>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 600,
            poll_interval: Duration::from_secs(1),
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(User),
    /// The user closed the popup before the provider redirected back.
    Cancelled,
}

pub struct PopupCoordinator {
    auth: AuthContext,
    host: Arc<dyn WindowHost>,
    config: PopupConfig,
}

impl PopupCoordinator {
    pub fn new(auth: AuthContext, host: Arc<dyn WindowHost>, config: PopupConfig) -> Self {
        Self { auth, host, config }
    }

    /// Run a popup login against `provider_url` until it completes.
    pub async fn start_login(&self, provider_url: &str) -> Result<LoginOutcome, AuthError> {
        if !self.auth.try_begin_authenticating() {
            return Err(AuthError::LoginInProgress);
        }
        let mut attempt = Attempt {
            auth: &self.auth,
            popup: None,
        };

        let features =
            PopupFeatures::centered(self.host.geometry(), self.config.width, self.config.height);

        // Listen before opening so a fast provider cannot answer unheard.
        let mut messages = self.host.messages().subscribe();

        let Some(popup) = self.host.open(provider_url, &features) else {
            warn!(provider_url, "Login popup was blocked");
            self.auth.notify(Notification::error(AuthError::PopupBlocked.to_string()));
            return Err(AuthError::PopupBlocked);
        };
        debug!(provider_url, features = %features.to_feature_string(), "Opened login popup");
        let popup = attempt.popup.insert(popup);

        let result = self.wait_for_completion(&mut messages, &**popup).await;

        match &result {
            Ok(LoginOutcome::Authenticated(user)) => {
                info!(email = %user.email, "Popup login completed");
                self.auth
                    .notify(Notification::success(format!("Signed in as {}", user.name)));
            }
            Ok(LoginOutcome::Cancelled) => debug!("Login popup closed before completion"),
            Err(e) => {
                warn!(error = %e, "Popup login failed");
                self.auth.notify(Notification::error(e.to_string()));
            }
        }
        result
    }

    async fn wait_for_completion(
        &self,
        messages: &mut Receiver<MessageEvent>,
        popup: &dyn PopupHandle,
    ) -> Result<LoginOutcome, AuthError> {
        let mut poll = time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let timeout = async {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                biased;

                received = messages.recv() => match received {
                    Ok(event) => {
                        if let Some(outcome) = self.handle_event(event)? {
                            return Ok(outcome);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Message listener lagged");
                    }
                    Err(RecvError::Closed) => return Ok(LoginOutcome::Cancelled),
                },

                _ = poll.tick() => {
                    if popup.is_closed() {
                        // A success posted just before the popup closed
                        // still counts.
                        loop {
                            match messages.try_recv() {
                                Ok(event) => {
                                    if let Some(outcome) = self.handle_event(event)? {
                                        return Ok(outcome);
                                    }
                                }
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        return Ok(LoginOutcome::Cancelled);
                    }
                }

                _ = &mut timeout => return Err(AuthError::TimedOut),
            }
        }
    }

    /// Returns `Ok(None)` for events that do not belong to this handshake.
    fn handle_event(&self, event: MessageEvent) -> Result<Option<LoginOutcome>, AuthError> {
        if event.origin != self.host.origin() {
            trace!(origin = %event.origin, "Ignoring message from foreign origin");
            return Ok(None);
        }

        let message: AuthMessage = match serde_json::from_value(event.data) {
            Ok(message) => message,
            Err(_) => {
                trace!("Ignoring non-auth message");
                return Ok(None);
            }
        };

        match message {
            AuthMessage::Success { data } => {
                let session = self.auth.handle_oauth_callback(data)?;
                Ok(Some(LoginOutcome::Authenticated(session.user().clone())))
            }
            AuthMessage::Error { error } => Err(AuthError::Provider(error)),
        }
    }
}

/// Teardown for one login attempt: closes the popup and clears
/// `is_authenticating` however the attempt ends.
struct Attempt<'a> {
    auth: &'a AuthContext,
    popup: Option<Box<dyn PopupHandle>>,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if let Some(popup) = self.popup.take() {
            if !popup.is_closed() {
                popup.close();
            }
        }
        self.auth.set_authenticating(false);
    }
}
