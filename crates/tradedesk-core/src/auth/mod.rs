//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `Session`/`User`: the persisted `{token, user, expiresAt}` record
//! - `SessionStore`: durable persistence of the session under the `auth` key
//! - `AuthContext`: tab-scoped reactive auth state and its mutators
//! - `PopupCoordinator`: the OAuth popup lifecycle and `postMessage` handshake
//! - `CallbackPage`: completes the handshake at the provider's redirect target
//! - `ExpiryWatcher`: periodic expiry enforcement
//!
//! Browser primitives (storage, windows, message events, navigation, toasts)
//! are modelled as traits in `storage`, `window`, `message` and `notify`.

pub mod callback;
pub mod context;
pub mod error;
pub mod expiry;
pub mod message;
pub mod notify;
pub mod popup;
pub mod provider;
pub mod session;
pub mod storage;
pub mod store;
pub mod window;

pub use callback::{CallbackEnv, CallbackOutcome, CallbackPage, CallbackParams};
pub use context::{AuthContext, AuthState};
pub use error::{AuthError, SessionError, StorageError};
pub use expiry::ExpiryWatcher;
pub use message::{AuthMessage, MessageChannel, MessageEvent};
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationLevel, Notifier};
pub use popup::{LoginOutcome, PopupConfig, PopupCoordinator};
pub use provider::AuthProvider;
pub use session::{AuthData, Session, User};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage};
pub use store::SessionStore;
pub use window::{Navigator, PopupFeatures, PopupHandle, Route, WindowGeometry, WindowHost};
