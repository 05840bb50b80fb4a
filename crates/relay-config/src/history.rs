use std::path::PathBuf;

use serde::Deserialize;

/// Request/response history persistence
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Directory receiving one JSON file per completed request
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_directory(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("history")
}
