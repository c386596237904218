//! REST client module for the tradedesk auth server.
//!
//! This module provides the `ApiClient` used for the server side of the
//! session lifecycle: credential login and best-effort logout. Identity
//! provider logins start at `provider_url` and finish in the popup.
//!
//! `AuthApi` is the seam the auth context calls through, so hosts and
//! tests can swap in a different server.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi, LoginResponse};
pub use error::ApiError;
