//! Core library for tradedesk.
//!
//! Implements the authentication session manager behind the trading
//! dashboard: the persisted session, the tab-scoped auth context, the
//! OAuth popup handshake and its callback page, session expiry, and the
//! auth server client used for logout and credential login.

pub mod api;
pub mod auth;
pub mod config;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{
    AuthContext, AuthData, AuthError, AuthMessage, AuthProvider, AuthState, CallbackPage,
    CallbackParams, PopupCoordinator, Session, SessionStore, User,
};
pub use config::Config;
pub use reqwest::Url;
