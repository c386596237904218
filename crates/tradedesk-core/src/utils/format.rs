use chrono::{DateTime, Duration, Local, Utc};

/// Format time left on a session, e.g. "expires in 2h 5m"
pub fn format_remaining(remaining: Option<Duration>) -> String {
    let Some(remaining) = remaining else {
        return "no expiry".to_string();
    };

    let minutes = remaining.num_minutes();
    if remaining <= Duration::zero() {
        "expired".to_string()
    } else if minutes < 1 {
        "expires in under a minute".to_string()
    } else if minutes < 60 {
        format!("expires in {}m", minutes)
    } else if minutes < 1440 {
        format!("expires in {}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("expires in {}d {}h", minutes / 1440, (minutes % 1440) / 60)
    }
}

/// Format an expiry timestamp in local time
pub fn format_expiry(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => at.with_timezone(&Local).format("%b %d, %Y %H:%M").to_string(),
        None => "never".to_string(),
    }
}

/// Join roles for display
pub fn format_roles(roles: Option<&[String]>) -> String {
    match roles {
        Some(roles) if !roles.is_empty() => roles.join(", "),
        _ => "none".to_string(),
    }
}

/// Show only the start of a bearer token
pub fn mask_token(token: &str) -> String {
    const VISIBLE: usize = 4;
    if token.chars().count() <= VISIBLE * 2 {
        "*".repeat(token.chars().count())
    } else {
        let head: String = token.chars().take(VISIBLE).collect();
        format!("{}...", head)
    }
}
