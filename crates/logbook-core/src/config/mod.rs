//! Remote API configuration shared by every client.

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Environment variable naming the remote API base URL.
pub const ENV_API_URL: &str = "LOGBOOK_API_URL";

/// Validated location of the remote entries API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    base_url: String,
}

impl RemoteConfig {
    /// Validate a base URL: non-empty, `http://` or `https://`, no trailing slash.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_text_option(Some(base_url.into())).ok_or_else(|| {
            Error::InvalidInput("API base URL must not be empty".to_string())
        })?;

        if !is_http_url(&base_url) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Read the base URL from `LOGBOOK_API_URL`.
    ///
    /// Returns `Ok(None)` when the variable is unset or blank.
    pub fn from_env() -> Result<Option<Self>> {
        parse_optional(std::env::var(ENV_API_URL).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Validate an optional URL, treating blank values as absent.
pub fn parse_optional(value: Option<String>) -> Result<Option<RemoteConfig>> {
    normalize_text_option(value).map(RemoteConfig::new).transpose()
}
