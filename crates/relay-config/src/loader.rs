use std::path::Path;

use http::{HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use crate::{Config, HeaderRuleConfig, is_header_pattern};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_retry()?;
        self.validate_streaming()?;
        self.validate_upstream()?;
        Ok(())
    }

    fn validate_retry(&self) -> anyhow::Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        self.retry.backoff.parse()?;
        Ok(())
    }

    fn validate_streaming(&self) -> anyhow::Result<()> {
        self.streaming.read_timeout()?;
        if self.streaming.max_line_bytes == 0 {
            anyhow::bail!("streaming.max_line_bytes must be greater than 0");
        }
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be greater than 0");
        }
        Ok(())
    }

    fn validate_upstream(&self) -> anyhow::Result<()> {
        let primary = &self.upstream.primary;
        primary.connect_timeout()?;

        for rule in &primary.headers {
            validate_header_rule(rule)?;
        }

        let Some(ref secondary) = self.upstream.secondary else {
            return Ok(());
        };

        secondary.timeout()?;

        if secondary.api_key.expose_secret().is_empty() {
            anyhow::bail!("upstream.secondary.api_key must not be empty");
        }

        if secondary.aliases.is_empty() {
            anyhow::bail!("upstream.secondary.aliases must map at least one model");
        }

        for (alias, target) in &secondary.aliases {
            if alias.is_empty() || target.is_empty() {
                anyhow::bail!("upstream.secondary.aliases entries must be non-empty (got '{alias}' = '{target}')");
            }
        }

        Ok(())
    }
}

fn validate_header_rule(rule: &HeaderRuleConfig) -> anyhow::Result<()> {
    let check_name_or_pattern = |name: &str| -> anyhow::Result<()> {
        if is_header_pattern(name) {
            regex::Regex::new(name).map_err(|e| anyhow::anyhow!("invalid header pattern '{name}': {e}"))?;
        } else {
            check_name(name)?;
        }
        Ok(())
    };

    match rule {
        HeaderRuleConfig::Forward(forward) => {
            check_name_or_pattern(&forward.name)?;
            if let Some(ref rename) = forward.rename {
                check_name(rename)?;
            }
            if let Some(ref default) = forward.default {
                check_value(default)?;
            }
        }
        HeaderRuleConfig::Insert(insert) => {
            check_name(&insert.name)?;
            check_value(&insert.value)?;
        }
        HeaderRuleConfig::Remove(remove) => check_name_or_pattern(&remove.name)?,
    }

    Ok(())
}

fn check_name(name: &str) -> anyhow::Result<()> {
    HeaderName::try_from(name).map_err(|e| anyhow::anyhow!("invalid header name '{name}': {e}"))?;
    Ok(())
}

fn check_value(value: &str) -> anyhow::Result<()> {
    HeaderValue::try_from(value).map_err(|e| anyhow::anyhow!("invalid header value '{value}': {e}"))?;
    Ok(())
}
