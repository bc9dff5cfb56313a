//! Provider configuration.
//!
//! Values come from the provider block first and fall back to environment
//! variables, then to defaults.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProviderError, Result};

/// Default CircleCI API v2 endpoint.
pub const DEFAULT_URL: &str = "https://circleci.com/api/v2/";
/// Default VCS type used in project and owner slugs.
pub const DEFAULT_VCS_TYPE: &str = "github";
/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment fallback for `url`.
pub const ENV_URL: &str = "CIRCLECI_URL";
/// Environment fallback for `token`.
pub const ENV_TOKEN: &str = "CIRCLECI_TOKEN";
/// Environment fallback for `vcs_type`.
pub const ENV_VCS_TYPE: &str = "CIRCLECI_VCS_TYPE";
/// Environment fallback for `organization`.
pub const ENV_ORGANIZATION: &str = "CIRCLECI_ORGANIZATION";

/// Fully resolved provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the API, with trailing slash.
    pub url: String,
    /// Personal API token, sent as `Circle-Token`.
    pub token: String,
    /// VCS segment of slugs.
    pub vcs_type: String,
    /// Default organization for resources that do not set one.
    pub organization: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .field("vcs_type", &self.vcs_type)
            .field("organization", &self.organization)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    url: Option<String>,
    token: Option<String>,
    vcs_type: Option<String>,
    organization: Option<String>,
    timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Resolve from a provider config value and the process environment.
    pub fn from_value(value: Value) -> Result<Self> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Resolve from a provider config value, looking fallbacks up with `env`.
    pub fn from_value_with_env<F>(value: Value, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match value {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other)?,
        };

        let pick = |explicit: Option<String>, key: &str| {
            explicit
                .filter(|v| !v.is_empty())
                .or_else(|| env(key).filter(|v| !v.is_empty()))
        };

        let token = pick(raw.token, ENV_TOKEN).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "token is required; set it in the provider block or via {}",
                ENV_TOKEN
            ))
        })?;

        let mut url = pick(raw.url, ENV_URL).unwrap_or_else(|| DEFAULT_URL.to_string());
        if !url.ends_with('/') {
            url.push('/');
        }

        Ok(Self {
            url,
            token,
            vcs_type: pick(raw.vcs_type, ENV_VCS_TYPE)
                .unwrap_or_else(|| DEFAULT_VCS_TYPE.to_string()),
            organization: pick(raw.organization, ENV_ORGANIZATION),
            timeout_secs: raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}
