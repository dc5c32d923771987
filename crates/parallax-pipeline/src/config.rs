//! Configuration for the pipeline core.

use serde::Deserialize;

/// Pipeline behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent pipeline workers.
    ///
    /// This is the bound on resource pressure against the builder and
    /// pusher backends; the queue itself is unbounded.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Registry target that pushed images are addressed under.
    #[serde(default = "default_registry_target")]
    pub registry_target: String,
}

const fn default_workers() -> usize {
    2
}

fn default_registry_target() -> String {
    "registry.parallax.local/apps".to_owned()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            registry_target: default_registry_target(),
        }
    }
}
