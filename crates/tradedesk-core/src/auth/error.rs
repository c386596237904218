use thiserror::Error;

use crate::api::ApiError;

/// Reasons a session cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session token is missing")]
    MissingToken,

    #[error("User email is missing")]
    MissingEmail,

    #[error("User name is missing")]
    MissingName,

    #[error("Session expiry {0} is not in the future")]
    ExpiryNotInFuture(i64),

    #[error("Session lifetime is out of range")]
    ExpiryOutOfRange,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Failed to serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Popup was blocked - allow popups for this site and try again")]
    PopupBlocked,

    #[error("A login is already in progress")]
    LoginInProgress,

    #[error("Login timed out")]
    TimedOut,

    #[error("{0}")]
    Provider(String),

    #[error("Invalid session: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
