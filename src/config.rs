//! Client configuration.
//!
//! `Config` is the base-URL collaborator: it owns where the backend
//! lives and the uniform call timeout. It carries serde derives so an
//! embedding application can persist it alongside its own settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP request timeout in seconds.
/// Applied uniformly to every call, including renewal and logout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend origin, e.g. `https://api.example.com`.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join a path onto the base URL, tolerating a trailing slash on
    /// the base and a missing leading slash on the path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let config = Config::new("https://api.example.com");
        assert_eq!(
            config.endpoint("/v1/users/login"),
            "https://api.example.com/v1/users/login"
        );
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let config = Config::new("https://api.example.com/");
        assert_eq!(
            config.endpoint("/v1/users/logout"),
            "https://api.example.com/v1/users/logout"
        );
    }

    #[test]
    fn test_endpoint_inserts_missing_leading_slash() {
        let config = Config::new("https://api.example.com");
        assert_eq!(
            config.endpoint("v1/users/refresh_token"),
            "https://api.example.com/v1/users/refresh_token"
        );
    }

    #[test]
    fn test_timeout_default_and_override() {
        assert_eq!(Config::new("x").timeout(), Duration::from_secs(30));
        assert_eq!(
            Config::new("x").with_timeout_secs(5).timeout(),
            Duration::from_secs(5)
        );
    }
}
