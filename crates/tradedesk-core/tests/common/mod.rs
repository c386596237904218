//! In-memory stand-ins for the browser and the auth server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, Notify};

use tradedesk_core::api::{ApiError, AuthApi, LoginResponse};
use tradedesk_core::auth::{
    AuthContext, ChannelNotifier, MemoryStorage, MessageChannel, Navigator, Notification,
    PopupFeatures, PopupHandle, Route, SessionStore, User, WindowGeometry, WindowHost,
};

pub const APP_ORIGIN: &str = "https://app.example.com";
pub const EVIL_ORIGIN: &str = "https://evil.example.com";
pub const PROVIDER_URL: &str = "https://api.example.com/auth/google";

#[derive(Default)]
pub struct PopupState {
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl PopupState {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The user closes the window.
    pub fn close_by_user(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

pub struct FakePopup(pub Arc<PopupState>);

impl PopupHandle for FakePopup {
    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    fn close(&self) {
        self.0.close_calls.fetch_add(1, Ordering::SeqCst);
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeHost {
    channel: MessageChannel,
    blocked: bool,
    pub popup: Arc<PopupState>,
    pub opened: Mutex<Vec<(String, PopupFeatures)>>,
    pub opened_signal: Notify,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::with_blocked(false)
    }

    pub fn blocking_popups() -> Self {
        Self::with_blocked(true)
    }

    fn with_blocked(blocked: bool) -> Self {
        Self {
            channel: MessageChannel::new(APP_ORIGIN),
            blocked,
            popup: Arc::new(PopupState::default()),
            opened: Mutex::new(Vec::new()),
            opened_signal: Notify::new(),
        }
    }

    /// Handle the callback page running inside the popup would hold.
    pub fn popup_window(&self) -> FakePopup {
        FakePopup(self.popup.clone())
    }
}

impl WindowHost for FakeHost {
    fn origin(&self) -> &str {
        APP_ORIGIN
    }

    fn geometry(&self) -> WindowGeometry {
        WindowGeometry {
            screen_x: 0,
            screen_y: 0,
            outer_width: 1200,
            outer_height: 800,
        }
    }

    fn open(&self, url: &str, features: &PopupFeatures) -> Option<Box<dyn PopupHandle>> {
        if self.blocked {
            return None;
        }
        self.opened
            .lock()
            .unwrap()
            .push((url.to_string(), *features));
        self.opened_signal.notify_one();
        Some(Box::new(FakePopup(self.popup.clone())))
    }

    fn messages(&self) -> &MessageChannel {
        &self.channel
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub fail_logout: bool,
    pub logouts: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn failing() -> Self {
        Self {
            fail_logout: true,
            ..Default::default()
        }
    }

    pub fn logout_tokens(&self) -> Vec<String> {
        self.logouts.lock().unwrap().clone()
    }
}

impl AuthApi for FakeApi {
    fn logout<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), ApiError>> {
        self.logouts.lock().unwrap().push(token.to_string());
        let fail = self.fail_logout;
        Box::pin(async move {
            if fail {
                Err(ApiError::ServerError("unreachable".to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn login<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a str,
    ) -> BoxFuture<'a, Result<LoginResponse, ApiError>> {
        Box::pin(async { Err(ApiError::Unauthorized) })
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes.lock().unwrap().push(route.clone());
    }
}

pub fn context(
    storage: &MemoryStorage,
    api: Arc<FakeApi>,
) -> (AuthContext, mpsc::UnboundedReceiver<Notification>) {
    let (notifier, rx) = ChannelNotifier::new();
    let ctx = AuthContext::new(
        SessionStore::new(Arc::new(storage.clone())),
        api,
        Arc::new(notifier),
        Duration::hours(24),
    );
    (ctx, rx)
}

pub fn alice() -> User {
    User::new("a@b.com", "Alice")
}

/// Raw stored blob for a session that expired a minute ago.
pub fn expired_blob(token: &str) -> String {
    let expires_at = (chrono::Utc::now() - Duration::minutes(1)).timestamp_millis();
    serde_json::json!({
        "token": token,
        "user": {"email": "a@b.com", "name": "Alice"},
        "expiresAt": expires_at
    })
    .to_string()
}
