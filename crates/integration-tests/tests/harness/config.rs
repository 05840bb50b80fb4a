//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use indexmap::IndexMap;
use relay_config::{BackoffConfig, Config, CorsConfig, SecondaryConfig, StreamMode};
use secrecy::SecretString;

/// Builder for constructing test configurations
///
/// Starts with history disabled, a short backoff and a short read timeout
/// so failure paths finish quickly.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(primary_base_url: &str) -> Self {
        let mut config = Config::default();

        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.upstream.primary.base_url = primary_base_url.parse().expect("valid URL");
        config.retry.backoff = BackoffConfig::Table {
            delays: vec!["10ms".to_owned()],
        };
        config.streaming.read_timeout = "2s".to_owned();
        config.history.enabled = false;

        Self { config }
    }

    /// Route `alias` to `native` on a secondary provider at `url`
    pub fn with_secondary(mut self, url: &str, alias: &str, native: &str) -> Self {
        let mut aliases = IndexMap::new();
        aliases.insert(alias.to_owned(), native.to_owned());

        self.config.upstream.secondary = Some(SecondaryConfig {
            url: url.parse().expect("valid URL"),
            api_key: SecretString::from("sk-secondary"),
            timeout: "5s".to_owned(),
            aliases,
        });
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.retry.max_attempts = max_attempts;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: &str) -> Self {
        read_timeout.clone_into(&mut self.config.streaming.read_timeout);
        self
    }

    pub fn with_mode(mut self, mode: StreamMode) -> Self {
        self.config.streaming.mode = mode;
        self
    }

    pub fn with_history(mut self, directory: &Path) -> Self {
        self.config.history.enabled = true;
        self.config.history.directory = directory.to_path_buf();
        self
    }

    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    pub fn with_health_path(mut self, path: &str) -> Self {
        path.clone_into(&mut self.config.server.health.path);
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
