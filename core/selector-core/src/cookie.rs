//! Optional remember-my-choice cookie.
//!
//! The core only ever writes this cookie, after a successful commit. Reading
//! it back is the upstream engine's job: it may copy the value into
//! [`FlowState::remembered_id`](crate::state::FlowState::remembered_id) when
//! it suspends the next flow.

use chrono::Duration;
use serde::Serialize;

pub const DEFAULT_COOKIE_NAME: &str = "selector_remember";
pub const DEFAULT_MAX_AGE_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RememberCookie {
    pub name: String,
    pub value: String,
    pub max_age_secs: i64,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl RememberCookie {
    /// Formats the cookie as a `Set-Cookie` header value.
    pub fn header_value(&self) -> Result<String, serde_urlencoded::ser::Error> {
        let mut header = serde_urlencoded::to_string([(self.name.as_str(), self.value.as_str())])?;
        header.push_str(&format!("; Max-Age={}; Path={}", self.max_age_secs, self.path));
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header.push_str("; SameSite=Lax");
        Ok(header)
    }
}

/// Sink for cookies produced during an interaction.
pub trait CookieWriter {
    fn set_cookie(&mut self, cookie: RememberCookie);
}

/// Collects cookies so the HTTP boundary can emit them with the response.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<RememberCookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookies(&self) -> &[RememberCookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieWriter for CookieJar {
    fn set_cookie(&mut self, cookie: RememberCookie) {
        self.cookies.push(cookie);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberSettings {
    pub cookie_name: String,
    pub max_age_days: u32,
    pub secure: bool,
}

impl Default for RememberSettings {
    fn default() -> Self {
        RememberSettings {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            secure: true,
        }
    }
}

impl RememberSettings {
    pub fn cookie_for(&self, selected_id: &str) -> RememberCookie {
        RememberCookie {
            name: self.cookie_name.clone(),
            value: selected_id.to_string(),
            max_age_secs: Duration::days(i64::from(self.max_age_days)).num_seconds(),
            path: "/".to_string(),
            secure: self.secure,
            http_only: true,
        }
    }
}
