use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            provider: None,
            roles: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_ref()
            .map(|roles| roles.iter().any(|r| r == role))
            .unwrap_or(false)
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.email.trim().is_empty() {
            return Err(SessionError::MissingEmail);
        }
        if self.name.trim().is_empty() {
            return Err(SessionError::MissingName);
        }
        Ok(())
    }
}

/// Payload of a completed OAuth handshake: `{token, user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthData {
    pub token: String,
    pub user: User,
}

impl AuthData {
    /// Build a session that expires `lifetime` from now.
    pub fn into_session(self, lifetime: Duration) -> Result<Session, SessionError> {
        let expires_at = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or(SessionError::ExpiryOutOfRange)?;
        Session::new(self.token, self.user, Some(expires_at))
    }
}

/// A fully present session. Partial sessions cannot be constructed.
///
/// Serialized as the stored `auth` blob:
/// `{"token": .., "user": {..}, "expiresAt": <epoch ms>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    token: String,
    user: User,
    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl Session {
    /// Create a session, rejecting empty credentials and expiries that are
    /// not strictly in the future.
    pub fn new(
        token: impl Into<String>,
        user: User,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, SessionError> {
        let session = Self {
            token: token.into(),
            user,
            expires_at: expires_at.map(|t| t.timestamp_millis()),
        };
        session.validate_fields()?;

        if let Some(ms) = session.expires_at {
            if ms <= Utc::now().timestamp_millis() {
                return Err(SessionError::ExpiryNotInFuture(ms));
            }
        }
        Ok(session)
    }

    /// Check the "fully present" invariant without looking at expiry.
    /// Used on sessions read back from storage, which may have expired since.
    pub fn validate_fields(&self) -> Result<(), SessionError> {
        if self.token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        self.user.validate()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn into_parts(self) -> (String, User) {
        (self.token, self.user)
    }

    pub fn expires_at_millis(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|ms| now.timestamp_millis() > ms)
            .unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time remaining before expiry, or `None` for sessions without one.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at().map(|expiry| expiry - Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("alice@example.com", "Alice")
    }

    #[test]
    fn test_session_requires_token_email_and_name() {
        assert_eq!(
            Session::new("", alice(), None).unwrap_err(),
            SessionError::MissingToken
        );
        assert_eq!(
            Session::new("t1", User::new("", "Alice"), None).unwrap_err(),
            SessionError::MissingEmail
        );
        assert_eq!(
            Session::new("t1", User::new("alice@example.com", "  "), None).unwrap_err(),
            SessionError::MissingName
        );
        assert!(Session::new("t1", alice(), None).is_ok());
    }

    #[test]
    fn test_session_rejects_past_expiry() {
        let past = Utc::now() - Duration::minutes(1);
        assert!(matches!(
            Session::new("t1", alice(), Some(past)),
            Err(SessionError::ExpiryNotInFuture(_))
        ));
    }

    #[test]
    fn test_is_expired_at() {
        let session = Session::new("t1", alice(), Some(Utc::now() + Duration::hours(1))).unwrap();
        assert!(!session.is_expired());
        assert!(session.is_expired_at(Utc::now() + Duration::hours(2)));

        let no_expiry = Session::new("t1", alice(), None).unwrap();
        assert!(!no_expiry.is_expired_at(Utc::now() + Duration::days(365)));
        assert!(no_expiry.time_until_expiry().is_none());
    }

    #[test]
    fn test_storage_schema() {
        let user = alice().with_provider("google").with_roles(["ADMIN", "USER"]);
        let session = Session {
            token: "t1".to_string(),
            user,
            expires_at: Some(1_700_000_000_000),
        };

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "token": "t1",
                "user": {
                    "email": "alice@example.com",
                    "name": "Alice",
                    "provider": "google",
                    "roles": ["ADMIN", "USER"]
                },
                "expiresAt": 1_700_000_000_000i64
            })
        );
    }

    #[test]
    fn test_optional_fields_omitted() {
        let session = Session::new("t1", alice(), None).unwrap();
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("provider"));
        assert!(!json.contains("roles"));
        assert!(!json.contains("expiresAt"));
    }

    #[test]
    fn test_into_session_rejects_unrepresentable_lifetime() {
        let data = AuthData {
            token: "t1".to_string(),
            user: alice(),
        };
        assert_eq!(
            data.clone().into_session(Duration::MAX).unwrap_err(),
            SessionError::ExpiryOutOfRange
        );
        assert!(data.into_session(Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_has_role() {
        let user = alice().with_roles(["ADMIN"]);
        assert!(user.has_role("ADMIN"));
        assert!(!user.has_role("USER"));
        assert!(!alice().has_role("ADMIN"));
    }
}
