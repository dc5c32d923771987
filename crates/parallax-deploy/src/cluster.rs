//! Cluster client abstraction.
//!
//! The resolver talks to the cluster through this trait: look up a workload
//! by name, apply a target specification, resolve the service handle that
//! the cluster creates alongside a workload. The real adapter lives in the
//! embedding service; the mock here backs tests and development mode.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::manifest::TargetSpec;

/// A workload as known to the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// Workload name.
    pub name: String,
    /// Namespace the workload lives in.
    pub namespace: String,
    /// The last applied specification.
    pub spec: TargetSpec,
    /// Apply counter: 1 after create, incremented by every further apply.
    pub generation: u64,
}

/// Network-accessible handle for a deployed workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHandle {
    /// Service name. The cluster creates it under the workload's name.
    pub name: String,
    /// Assigned cluster-internal address.
    pub cluster_ip: String,
}

/// Client for looking up and applying workloads.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Look up a workload by name.
    ///
    /// Returns `None` if no workload of that name exists in the namespace.
    async fn get(&self, namespace: &str, name: &str) -> DeployResult<Option<Workload>>;

    /// Apply a target specification.
    ///
    /// Creates the workload if it does not exist, otherwise replaces the
    /// existing object's spec; the cluster's own rollout mechanics handle
    /// the transition. The spec's `name` must be resolved before applying.
    async fn apply(&self, spec: &TargetSpec) -> DeployResult<()>;

    /// Resolve the service handle for a workload.
    ///
    /// Returns `None` if the service does not exist (yet).
    async fn resolve_endpoint(&self, namespace: &str, name: &str)
        -> DeployResult<Option<ServiceHandle>>;
}

/// Mock cluster client for testing and development.
///
/// Applying a spec records the workload and creates a service handle under
/// the same name, mirroring the cluster's behaviour. Failures can be
/// injected per operation.
#[derive(Debug, Default)]
pub struct MockClusterClient {
    workloads: DashMap<(String, String), Workload>,
    fail_get: Option<String>,
    fail_apply: Option<String>,
    fail_endpoint: Option<String>,
    suppress_services: bool,
}

impl MockClusterClient {
    /// Create an empty mock cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every lookup fail with the given message.
    #[must_use]
    pub fn failing_get(mut self, message: impl Into<String>) -> Self {
        self.fail_get = Some(message.into());
        self
    }

    /// Make every apply fail with the given message.
    #[must_use]
    pub fn failing_apply(mut self, message: impl Into<String>) -> Self {
        self.fail_apply = Some(message.into());
        self
    }

    /// Make every endpoint lookup fail with the given message.
    #[must_use]
    pub fn failing_endpoint(mut self, message: impl Into<String>) -> Self {
        self.fail_endpoint = Some(message.into());
        self
    }

    /// Do not create service handles on apply, so endpoint lookups return
    /// `None` (a workload whose service has not materialized yet).
    #[must_use]
    pub const fn without_services(mut self) -> Self {
        self.suppress_services = true;
        self
    }

    /// Seed an existing workload, as if applied earlier.
    pub fn seed(&self, spec: TargetSpec) {
        let name = spec.name.clone().unwrap_or_default();
        let namespace = spec.namespace.clone();
        self.workloads.insert(
            (namespace.clone(), name.clone()),
            Workload {
                name,
                namespace,
                spec,
                generation: 1,
            },
        );
    }

    /// Number of workloads currently recorded.
    #[must_use]
    pub fn workload_count(&self) -> usize {
        self.workloads.len()
    }

    fn fabricate_ip(name: &str) -> String {
        // Stable per name, good enough for a mock.
        let sum: u32 = name.bytes().map(u32::from).sum();
        format!("10.96.{}.{}", (sum >> 8) & 0xff, sum & 0xff)
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn get(&self, namespace: &str, name: &str) -> DeployResult<Option<Workload>> {
        if let Some(message) = &self.fail_get {
            return Err(DeployError::cluster(message.clone()));
        }

        let key = (namespace.to_owned(), name.to_owned());
        Ok(self.workloads.get(&key).map(|w| w.value().clone()))
    }

    async fn apply(&self, spec: &TargetSpec) -> DeployResult<()> {
        if let Some(message) = &self.fail_apply {
            return Err(DeployError::cluster(message.clone()));
        }

        let name = spec
            .name
            .clone()
            .ok_or_else(|| DeployError::internal("target spec has no resolved name"))?;
        let key = (spec.namespace.clone(), name.clone());

        match self.workloads.get_mut(&key) {
            Some(mut existing) => {
                existing.spec = spec.clone();
                existing.generation += 1;
            }
            None => {
                self.workloads.insert(
                    key,
                    Workload {
                        name,
                        namespace: spec.namespace.clone(),
                        spec: spec.clone(),
                        generation: 1,
                    },
                );
            }
        }

        Ok(())
    }

    async fn resolve_endpoint(
        &self,
        namespace: &str,
        name: &str,
    ) -> DeployResult<Option<ServiceHandle>> {
        if let Some(message) = &self.fail_endpoint {
            return Err(DeployError::cluster(message.clone()));
        }
        if self.suppress_services {
            return Ok(None);
        }

        let key = (namespace.to_owned(), name.to_owned());
        Ok(self.workloads.get(&key).map(|w| ServiceHandle {
            name: w.name.clone(),
            cluster_ip: Self::fabricate_ip(&w.name),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{synthesize, DeployRequest};

    fn named_spec(name: &str) -> TargetSpec {
        let mut spec = synthesize(&DeployRequest {
            namespace: "default".to_owned(),
            image_ref: "registry.local/apps:abc123".to_owned(),
            ..DeployRequest::default()
        })
        .expect("synthesize failed");
        spec.name = Some(name.to_owned());
        spec
    }

    #[tokio::test]
    async fn apply_creates_then_updates() {
        let cluster = MockClusterClient::new();
        let spec = named_spec("fn-a");

        cluster.apply(&spec).await.expect("apply failed");
        let created = cluster
            .get("default", "fn-a")
            .await
            .expect("get failed")
            .expect("workload missing");
        assert_eq!(created.generation, 1);

        let mut updated = spec;
        updated.image = "registry.local/apps:def456".to_owned();
        cluster.apply(&updated).await.expect("apply failed");

        let after = cluster
            .get("default", "fn-a")
            .await
            .expect("get failed")
            .expect("workload missing");
        assert_eq!(after.generation, 2);
        assert_eq!(after.spec.image, "registry.local/apps:def456");
        assert_eq!(cluster.workload_count(), 1);
    }

    #[tokio::test]
    async fn apply_requires_resolved_name() {
        let cluster = MockClusterClient::new();
        let mut spec = named_spec("fn-a");
        spec.name = None;

        let result = cluster.apply(&spec).await;
        assert!(matches!(result, Err(DeployError::Internal(_))));
    }

    #[tokio::test]
    async fn endpoint_follows_workload() {
        let cluster = MockClusterClient::new();

        let missing = cluster
            .resolve_endpoint("default", "fn-a")
            .await
            .expect("resolve failed");
        assert!(missing.is_none());

        cluster.apply(&named_spec("fn-a")).await.expect("apply failed");

        let handle = cluster
            .resolve_endpoint("default", "fn-a")
            .await
            .expect("resolve failed")
            .expect("service missing");
        assert_eq!(handle.name, "fn-a");
        assert!(!handle.cluster_ip.is_empty());
    }

    #[tokio::test]
    async fn injected_failures() {
        let cluster = MockClusterClient::new().failing_apply("connection refused");
        let result = cluster.apply(&named_spec("fn-a")).await;
        assert!(matches!(result, Err(DeployError::Cluster(_))));

        let cluster = MockClusterClient::new().without_services();
        cluster.apply(&named_spec("fn-a")).await.expect("apply failed");
        let handle = cluster
            .resolve_endpoint("default", "fn-a")
            .await
            .expect("resolve failed");
        assert!(handle.is_none());
    }
}
