use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::headers::{HeaderRuleConfig, default_primary_headers};

/// Default primary provider API root
pub const DEFAULT_PRIMARY_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Upstream provider configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Generic chat-completion API, SSE-capable, used with full retries
    #[serde(default)]
    pub primary: PrimaryConfig,
    /// Optional non-streaming provider probed once for aliased models
    #[serde(default)]
    pub secondary: Option<SecondaryConfig>,
}

/// Primary provider configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimaryConfig {
    /// API root; `/chat/completions`, `/models` and `/generation` are appended
    #[serde(default = "default_primary_base_url")]
    pub base_url: Url,
    /// Timeout for establishing the upstream connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
    /// Outbound header rules, applied in order
    #[serde(default = "default_primary_headers")]
    pub headers: Vec<HeaderRuleConfig>,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_primary_base_url(),
            connect_timeout: default_connect_timeout(),
            headers: default_primary_headers(),
        }
    }
}

impl PrimaryConfig {
    /// Parsed connect timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `connect_timeout` is not a valid duration
    pub fn connect_timeout(&self) -> anyhow::Result<std::time::Duration> {
        crate::parse_duration("upstream.primary.connect_timeout", &self.connect_timeout)
    }
}

/// Secondary provider configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecondaryConfig {
    /// Full chat-completions endpoint URL
    pub url: Url,
    /// Bearer token substituted for the caller's authorization
    pub api_key: SecretString,
    /// Total timeout for the single secondary attempt
    #[serde(default = "default_secondary_timeout")]
    pub timeout: String,
    /// Inbound model alias mapped to the provider's native model identifier
    #[serde(default)]
    pub aliases: IndexMap<String, String>,
}

impl SecondaryConfig {
    /// Parsed total request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is not a valid duration
    pub fn timeout(&self) -> anyhow::Result<std::time::Duration> {
        crate::parse_duration("upstream.secondary.timeout", &self.timeout)
    }
}

#[allow(clippy::missing_panics_doc)]
fn default_primary_base_url() -> Url {
    Url::parse(DEFAULT_PRIMARY_BASE_URL).expect("default base URL is valid")
}

fn default_connect_timeout() -> String {
    "5s".to_owned()
}

fn default_secondary_timeout() -> String {
    "60s".to_owned()
}
