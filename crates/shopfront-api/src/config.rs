//! # API Settings
//!
//! The `[api]` section of `shopfront.toml`.
//!
//! ```toml
//! [api]
//! base_url = "https://store.example.com/api"
//! timeout_secs = 15
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ApiError, ApiResult};

/// Default base URL, matching a store API running locally.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

/// Connection settings for the remote store API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Root URL the endpoint paths are appended to. May carry a path prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds). Applies to every call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiSettings {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses and checks the base URL.
    ///
    /// ## Rules
    /// - Must be an absolute `http` or `https` URL
    /// - Must be able to carry path segments (no `mailto:`-style URLs)
    /// - Timeout must be at least one second
    pub fn validate(&self) -> ApiResult<Url> {
        let url = Url::parse(self.base_url.trim())?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "base URL must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(self.base_url.clone()));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(url)
    }
}
