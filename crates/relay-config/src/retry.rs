use std::time::Duration;

use serde::Deserialize;

use crate::parse_duration;

/// Retry policy for primary-provider attempts
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait inserted between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Backoff policy between attempts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum BackoffConfig {
    /// Fixed delays indexed by attempt; the last entry repeats once exhausted
    Table { delays: Vec<String> },
    /// `base * 2^attempt`, capped at `max`
    Exponential { base: String, max: String },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::Table {
            delays: vec!["500ms".to_owned(), "1s".to_owned(), "3s".to_owned()],
        }
    }
}

/// Backoff policy with durations parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBackoff {
    Table(Vec<Duration>),
    Exponential { base: Duration, max: Duration },
}

impl BackoffConfig {
    /// Parse and validate the configured durations
    ///
    /// # Errors
    ///
    /// Returns an error when a duration is malformed, the table is empty, or
    /// the exponential base exceeds its ceiling
    pub fn parse(&self) -> anyhow::Result<ParsedBackoff> {
        match self {
            Self::Table { delays } => {
                if delays.is_empty() {
                    anyhow::bail!("retry.backoff.delays must not be empty");
                }
                let delays = delays
                    .iter()
                    .map(|d| parse_duration("retry.backoff.delays", d))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(ParsedBackoff::Table(delays))
            }
            Self::Exponential { base, max } => {
                let base = parse_duration("retry.backoff.base", base)?;
                let max = parse_duration("retry.backoff.max", max)?;
                if base > max {
                    anyhow::bail!("retry.backoff.base must not exceed retry.backoff.max");
                }
                Ok(ParsedBackoff::Exponential { base, max })
            }
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}
