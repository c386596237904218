//! Periodic enforcement of the stored session's `expiresAt`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::context::AuthContext;

/// Background task that logs out once the stored session expires.
/// Stops when dropped.
pub struct ExpiryWatcher {
    handle: JoinHandle<()>,
}

impl ExpiryWatcher {
    /// Spawn the watcher on the current tokio runtime. The first check runs
    /// immediately, so a session that expired while the app was closed is
    /// cleared on startup.
    pub fn spawn(auth: AuthContext, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                check_expiry(&auth).await;
            }
        });
        debug!(?interval, "Expiry watcher started");
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ExpiryWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run one expiry check. Returns whether the session was expired and
/// logged out.
pub async fn check_expiry(auth: &AuthContext) -> bool {
    let Some(session) = auth.store().load() else {
        return false;
    };
    if !session.is_expired() {
        return false;
    }

    info!(email = %session.user().email, "Session expired, logging out");
    auth.expire().await;
    true
}
