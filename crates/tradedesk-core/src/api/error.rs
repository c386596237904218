use thiserror::Error;

/// Failures talking to the auth server's `/auth/*` endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401: wrong credentials on login, or a token the server no longer knows.
    #[error("Unauthorized - invalid credentials or expired token")]
    Unauthorized,

    /// 403, e.g. a disabled account or a rejected CSRF check.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// 429 from repeated failed logins.
    #[error("Too many attempts - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Anything else, including 404 from a misconfigured base URL.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            404 => ApiError::InvalidResponse(format!(
                "Auth endpoint not found (check api_base_url): {}",
                truncated
            )),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
