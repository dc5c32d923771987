//! Service composition.
//!
//! Wires the orchestrator and resolver with their adapters. The in-memory
//! wiring backs development mode and tests; production deployments inject
//! real record store, builder, pusher and cluster adapters in its place.

use std::sync::Arc;

use parallax_deploy::{DeploymentResolver, MockClusterClient};
use parallax_pipeline::{
    MemoryBlobStore, MemoryRecordStore, MockBuilder, MockPusher, TaskOrchestrator,
};

use crate::config::ParallaxConfig;

/// The composed core services behind the HTTP API.
#[derive(Clone)]
pub struct AppServices {
    /// Task orchestrator.
    pub orchestrator: Arc<TaskOrchestrator>,
    /// Deployment resolver.
    pub resolver: Arc<DeploymentResolver>,
}

impl AppServices {
    /// Compose the services with in-memory adapters.
    #[must_use]
    pub fn in_memory(config: &ParallaxConfig) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let blob = Arc::new(MemoryBlobStore::new());
        let builder = Arc::new(MockBuilder::new(blob));
        let pusher = Arc::new(MockPusher::new());

        let orchestrator = Arc::new(TaskOrchestrator::new(
            store,
            builder,
            pusher,
            config.pipeline.clone(),
        ));

        let cluster = Arc::new(MockClusterClient::new());
        let resolver = Arc::new(DeploymentResolver::new(cluster, config.resolver.clone()));

        Self {
            orchestrator,
            resolver,
        }
    }
}
