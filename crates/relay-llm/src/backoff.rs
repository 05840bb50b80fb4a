//! Wait durations between retry attempts

use std::time::Duration;

use relay_config::ParsedBackoff;

/// Deterministic mapping from attempt index to wait duration
///
/// Both policies are non-decreasing in the attempt index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// Lookup table indexed by attempt, clamped to its last entry
    Table(Vec<Duration>),
    /// `base * 2^attempt`, clamped to `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Table(vec![
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(3),
        ])
    }
}

impl From<ParsedBackoff> for Backoff {
    fn from(parsed: ParsedBackoff) -> Self {
        match parsed {
            ParsedBackoff::Table(delays) => Self::Table(delays),
            ParsedBackoff::Exponential { base, max } => Self::Exponential { base, max },
        }
    }
}

impl Backoff {
    /// Delay to wait after the failed attempt with the given index
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Table(delays) => {
                let last = usize::try_from(attempt).map_or(usize::MAX, |a| a.saturating_add(1));
                // running maximum keeps a misordered table monotonic
                delays.iter().take(last).copied().max().unwrap_or_default()
            }
            Self::Exponential { base, max } => 2u32
                .checked_pow(attempt)
                .and_then(|factor| base.checked_mul(factor))
                .map_or(*max, |delay| delay.min(*max)),
        }
    }
}
