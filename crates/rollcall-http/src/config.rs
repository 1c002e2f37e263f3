//! `[http]` configuration table

use rollcall_core::AttendanceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Client-level timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for the remote attendance store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    /// Root of the REST API
    pub base_url: String,
    /// Timeout applied to every request
    pub timeout_secs: u64,
    /// `User-Agent` header
    pub user_agent: String,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("rollcall/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpBackendConfig {
    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Request timeout; never zero
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Parse the `[http]` table of a TOML document
    ///
    /// # Errors
    /// `AttendanceError::Config` on syntax errors or a blank base URL.
    pub fn from_toml_str(source: &str) -> Result<Self, AttendanceError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            http: HttpBackendConfig,
        }

        let document: Document =
            toml::from_str(source).map_err(|e| AttendanceError::Config(e.to_string()))?;
        if document.http.base_url.trim().is_empty() {
            return Err(AttendanceError::Config("http.base_url must not be empty".to_string()));
        }
        Ok(document.http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_http_table_and_ignores_others() {
        let config = HttpBackendConfig::from_toml_str(
            r#"
            [engine]
            history_window = 50

            [http]
            base_url = "https://school.example/api"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://school.example/api");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.user_agent.starts_with("rollcall/"));
    }

    #[test]
    fn missing_table_uses_defaults() {
        let config = HttpBackendConfig::from_toml_str("").unwrap();
        assert_eq!(config, HttpBackendConfig::default());
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let result = HttpBackendConfig::from_toml_str("[http]\nbase_url = \"  \"\n");
        assert!(matches!(result, Err(AttendanceError::Config(_))));
    }
}
