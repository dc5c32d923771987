//! Configuration for the Parallax service.

use std::net::SocketAddr;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use parallax_deploy::ResolverConfig;
use parallax_pipeline::PipelineConfig;

/// Top-level configuration for the service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParallaxConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline behaviour configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Deployment resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl ParallaxConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources
    /// override earlier):
    /// 1. Default values
    /// 2. `parallax.toml` in the current directory (if present)
    /// 3. Environment variables with `PARALLAX_` prefix
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("parallax.toml"))
            .merge(Env::prefixed("PARALLAX_").split("__"))
            .extract()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP API.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid address")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ParallaxConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.resolver.cluster_domain, "svc.cluster.local");
    }

    #[test]
    fn config_from_toml() {
        let toml = r#"
            [server]
            listen_addr = "127.0.0.1:9000"

            [pipeline]
            workers = 4
            registry_target = "registry.example.com/apps"

            [resolver]
            cluster_domain = "svc.cluster.example"
        "#;

        let config: ParallaxConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.registry_target, "registry.example.com/apps");
        assert_eq!(config.resolver.cluster_domain, "svc.cluster.example");
    }
}
