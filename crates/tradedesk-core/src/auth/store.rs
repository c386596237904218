use std::sync::Arc;

use tracing::{debug, warn};

use super::error::StorageError;
use super::session::Session;
use super::storage::Storage;

/// Storage key holding the serialized session.
pub const STORAGE_KEY: &str = "auth";

/// Durable persistence of the single session for this profile.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Read the stored session. Unreadable, unparseable or partial blobs are
    /// logged and reported as no session.
    pub fn load(&self) -> Option<Session> {
        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                return None;
            }
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to parse stored session");
                return None;
            }
        };

        if let Err(e) = session.validate_fields() {
            warn!(error = %e, "Stored session is incomplete");
            return None;
        }

        debug!(email = %session.user().email, "Loaded stored session");
        Some(session)
    }

    /// Replace the stored session with a single write.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let blob = serde_json::to_string(session)?;
        self.storage.set(STORAGE_KEY, &blob)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(STORAGE_KEY)
    }
}
