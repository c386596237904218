//! The OAuth callback page.
//!
//! Runs at the identity provider's redirect target. The query string is
//! reduced to `AuthData` (or a failure message) and then either posted to
//! the window that opened the popup, or, when there is no opener, applied
//! to the auth context directly.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, warn};

use super::context::AuthContext;
use super::message::{AuthMessage, MessageChannel};
use super::session::{AuthData, User};
use super::window::{Navigator, PopupHandle, Route};

/// Failure message used when the provider does not supply one.
pub const GENERIC_FAILURE: &str = "Authentication failed";

/// Delay between posting to the opener and closing the popup, so the
/// message is delivered before the window goes away.
pub const CLOSE_DELAY: Duration = Duration::from_millis(100);

/// Query parameters the identity provider redirects back with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub auth_success: bool,
    pub token: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub provider: Option<String>,
    pub roles: Vec<String>,
    pub message: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    /// Parse a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            });
        Self::from_pairs(pairs)
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key.as_ref() {
                "auth_success" => params.auth_success = value == "true",
                "token" => params.token = non_empty(value),
                "email" => params.email = non_empty(value),
                "name" => params.name = non_empty(value),
                "provider" => params.provider = non_empty(value),
                "roles" => params.roles = parse_roles(value),
                "message" => params.message = non_empty(value),
                _ => {}
            }
        }
        params
    }

    /// Check the handshake completed with every required field.
    /// On failure returns the message to show the user.
    pub fn validate(&self) -> Result<AuthData, String> {
        let fields = (
            self.auth_success,
            self.token.as_ref(),
            self.email.as_ref(),
            self.name.as_ref(),
        );
        let (true, Some(token), Some(email), Some(name)) = fields else {
            return Err(self
                .message
                .clone()
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()));
        };

        let mut user = User::new(email.clone(), name.clone());
        user.provider = self.provider.clone();
        if !self.roles.is_empty() {
            user.roles = Some(self.roles.clone());
        }

        Ok(AuthData {
            token: token.clone(),
            user,
        })
    }
}

fn decode_component(raw: &str) -> Cow<'_, str> {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Split a comma list into distinct, non-empty roles, keeping order.
pub fn parse_roles(raw: &str) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for role in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        if !roles.iter().any(|r| r == role) {
            roles.push(role.to_string());
        }
    }
    roles
}

/// Where the callback page is running.
pub enum CallbackEnv<'a> {
    /// Inside the login popup; `opener` is the window that opened it.
    Popup {
        opener: &'a MessageChannel,
        own_origin: &'a str,
        window: &'a dyn PopupHandle,
    },
    /// Reached directly, without an opener.
    Standalone {
        auth: &'a AuthContext,
        navigator: &'a dyn Navigator,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Result handed to the opener, which finishes the login.
    Posted(AuthMessage),
    Navigated(Route),
    /// The page already ran; nothing was done.
    AlreadyHandled,
}

/// One-shot handler for the callback route.
#[derive(Debug)]
pub struct CallbackPage {
    handled: AtomicBool,
    close_delay: Duration,
}

impl Default for CallbackPage {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackPage {
    pub fn new() -> Self {
        Self::with_close_delay(CLOSE_DELAY)
    }

    pub fn with_close_delay(close_delay: Duration) -> Self {
        Self {
            handled: AtomicBool::new(false),
            close_delay,
        }
    }

    /// Complete the handshake. Only the first call has any effect.
    pub async fn run(&self, params: &CallbackParams, env: CallbackEnv<'_>) -> CallbackOutcome {
        if self.handled.swap(true, Ordering::SeqCst) {
            debug!("Callback already handled");
            return CallbackOutcome::AlreadyHandled;
        }

        let result = params.validate();
        if let Err(ref message) = result {
            warn!(%message, "OAuth callback rejected");
        }

        match env {
            CallbackEnv::Popup {
                opener,
                own_origin,
                window,
            } => {
                let message = match result {
                    Ok(data) => AuthMessage::Success { data },
                    Err(error) => AuthMessage::Error { error },
                };
                self.post_to_opener(opener, own_origin, &message);

                tokio::time::sleep(self.close_delay).await;
                window.close();
                CallbackOutcome::Posted(message)
            }
            CallbackEnv::Standalone { auth, navigator } => {
                let route = match result {
                    Ok(data) => match auth.handle_oauth_callback(data) {
                        Ok(_) => Route::Home,
                        Err(e) => {
                            warn!(error = %e, "Failed to establish session from callback");
                            Route::Login {
                                error: Some(e.to_string()),
                            }
                        }
                    },
                    Err(error) => {
                        auth.clear_local();
                        Route::Login { error: Some(error) }
                    }
                };
                navigator.navigate(&route);
                CallbackOutcome::Navigated(route)
            }
        }
    }

    fn post_to_opener(&self, opener: &MessageChannel, own_origin: &str, message: &AuthMessage) {
        let data = match serde_json::to_value(message) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to encode message for opener");
                return;
            }
        };
        // Target the opener's own origin; credentials never go to "*".
        let delivered = opener.post_message(data, opener.origin(), own_origin);
        debug!(delivered, "Posted callback result to opener");
    }
}
