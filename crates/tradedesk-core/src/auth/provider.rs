//! Single initialization point for a tab's auth layer.

use std::sync::Arc;

use tracing::debug;

use crate::api::AuthApi;
use crate::config::Config;

use super::context::AuthContext;
use super::expiry::{self, ExpiryWatcher};
use super::notify::Notifier;
use super::popup::{PopupConfig, PopupCoordinator};
use super::storage::Storage;
use super::store::SessionStore;
use super::window::WindowHost;

/// Owns the auth context and its expiry watcher for one tab.
///
/// Dropping the provider stops the watcher. Clones of the context handed
/// out by `context()` stay usable but are no longer watched.
pub struct AuthProvider {
    auth: AuthContext,
    watcher: Option<ExpiryWatcher>,
    popup: PopupConfig,
}

impl AuthProvider {
    /// Hydrate auth state from `storage` and start the expiry watcher.
    /// Must be called from within a tokio runtime.
    ///
    /// A stored session that has already expired starts logged out; the
    /// watcher's first tick then revokes it on the server and clears it.
    pub fn start(
        config: &Config,
        storage: Arc<dyn Storage>,
        api: Arc<dyn AuthApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth = AuthContext::new(
            SessionStore::new(storage),
            api,
            notifier,
            config.session_lifetime(),
        );
        let watcher = ExpiryWatcher::spawn(auth.clone(), config.expiry_check_interval());
        debug!(authenticated = auth.is_authenticated(), "Auth provider started");

        Self {
            auth,
            watcher: Some(watcher),
            popup: config.popup_config(),
        }
    }

    pub fn context(&self) -> &AuthContext {
        &self.auth
    }

    /// Popup coordinator bound to this provider's context.
    pub fn popup_coordinator(&self, host: Arc<dyn WindowHost>) -> PopupCoordinator {
        PopupCoordinator::new(self.auth.clone(), host, self.popup.clone())
    }

    /// Run an expiry check now instead of waiting for the next tick.
    pub async fn check_expiry(&self) -> bool {
        expiry::check_expiry(&self.auth).await
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(ExpiryWatcher::is_running)
    }

    pub fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
            debug!("Auth provider shut down");
        }
    }
}
