//! Session configuration.

use crate::error::{SessionError, SessionResult};
use std::time::Duration;

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Session configuration.
///
/// Controls the lifetime of sessions and the attributes of the cookie that
/// carries the session token.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
    /// Absolute lifetime of a session, counted from its creation
    pub lifetime: Duration,
    /// Cookie path
    pub cookie_path: String,
    /// Cookie domain
    pub cookie_domain: Option<String>,
    /// Only send the cookie over HTTPS
    pub cookie_secure: bool,
    /// Hide the cookie from scripts
    pub cookie_http_only: bool,
    /// SameSite attribute
    pub cookie_same_site: SameSite,
    /// Key prefix for remote stores
    pub namespace: String,
    /// Connection URL for remote stores
    pub url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            lifetime: Duration::from_secs(12 * 60 * 60),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_secure: true,
            cookie_http_only: true,
            cookie_same_site: SameSite::Lax,
            namespace: "session".to_string(),
            url: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default cookie attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Redis-backed session configuration.
    ///
    /// ```
    /// use daybook_session::SessionConfig;
    ///
    /// let config = SessionConfig::redis("redis://localhost:6379").unwrap();
    /// assert_eq!(config.url.as_deref(), Some("redis://localhost:6379"));
    /// ```
    pub fn redis(url: &str) -> SessionResult<Self> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(SessionError::InvalidUrl(
                "Redis URL must start with redis:// or rediss://".to_string(),
            ));
        }

        Ok(Self {
            url: Some(url.to_string()),
            ..Default::default()
        })
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Development servers run without TLS, so the Secure flag can be turned off.
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Build the store key with namespace.
    pub fn session_key(&self, token: &str) -> String {
        format!("{}:{}", self.namespace, token)
    }

    /// Build a `Set-Cookie` value carrying `token` for `max_age_secs` seconds.
    pub fn cookie(&self, token: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}",
            self.cookie_name,
            token,
            self.cookie_path,
            max_age_secs.max(0)
        );

        if let Some(ref domain) = self.cookie_domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.cookie_http_only {
            cookie.push_str("; HttpOnly");
        }

        if self.cookie_secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.cookie_same_site.as_str()));

        cookie
    }

    /// Build a `Set-Cookie` value that makes the browser drop the session cookie.
    pub fn removal_cookie(&self) -> String {
        let mut cookie = self.cookie("", 0);
        cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        cookie
    }
}
