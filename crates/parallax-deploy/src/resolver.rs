//! Deployment resolution: create-vs-update decision and cluster apply.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::ClusterClient;
use crate::error::DeployResult;
use crate::manifest::TargetSpec;
use crate::names;

/// Resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Cluster-internal domain suffix used for endpoint names.
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,

    /// How many readable name candidates to try before falling back to an
    /// id-suffixed name.
    #[serde(default = "default_name_attempts")]
    pub name_attempts: usize,
}

fn default_cluster_domain() -> String {
    "svc.cluster.local".to_owned()
}

const fn default_name_attempts() -> usize {
    8
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cluster_domain: default_cluster_domain(),
            name_attempts: default_name_attempts(),
        }
    }
}

/// Reachability of the service behind a deployed workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// The service exists and is addressable.
    Found,
    /// The service could not be confirmed (yet).
    NotFound,
}

impl ServiceStatus {
    /// Get the status name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a resolved and applied deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployOutcome {
    /// Final workload name (caller-supplied or generated).
    pub app_name: String,
    /// Namespace the workload was applied to.
    pub namespace: String,
    /// Name of the service created for the workload, when confirmed.
    pub service_name: Option<String>,
    /// Whether the service could be confirmed.
    pub service_status: ServiceStatus,
    /// Cluster-internal endpoint, when the service was confirmed.
    pub endpoint: Option<String>,
    /// Whether the applied spec autoscales.
    pub enable_autoscaling: bool,
    /// Whether the applied spec carries the spot hint.
    pub use_spot: bool,
    /// Failure message. Always `None` on the success path; populated by the
    /// API layer when shaping failure responses.
    pub error: Option<String>,
}

/// Decides create-vs-update and applies target specifications.
pub struct DeploymentResolver {
    cluster: Arc<dyn ClusterClient>,
    config: ResolverConfig,
}

impl DeploymentResolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>, config: ResolverConfig) -> Self {
        Self { cluster, config }
    }

    /// Resolve the workload name, apply the spec and report the endpoint.
    ///
    /// - Caller-supplied name and a workload of that name exists: this is
    ///   an update; the new spec replaces the existing object and the
    ///   cluster's rollout mechanics handle the transition.
    /// - Caller-supplied name with no existing workload, or no name at all:
    ///   this is a create; an absent name is filled with a generated unique
    ///   readable name.
    ///
    /// Two concurrent deploys for the same name race on the lookup; the
    /// outcome is last-apply-wins, consistent with the cluster's own
    /// conflict semantics.
    pub async fn resolve_and_apply(&self, spec: TargetSpec) -> DeployResult<DeployOutcome> {
        let namespace = spec.namespace.clone();
        let enable_autoscaling = spec.scaling.is_autoscaling();
        let use_spot = spec.scheduling.is_some();

        let name = match &spec.name {
            Some(name) => {
                match self.cluster.get(&namespace, name).await? {
                    Some(existing) => {
                        info!(
                            app_name = %name,
                            namespace = %namespace,
                            generation = existing.generation,
                            "updating existing workload"
                        );
                    }
                    None => {
                        info!(app_name = %name, namespace = %namespace, "creating named workload");
                    }
                }
                name.clone()
            }
            None => {
                let generated = self.unique_name(&namespace).await?;
                info!(app_name = %generated, namespace = %namespace, "creating workload with generated name");
                generated
            }
        };

        let mut named = spec;
        named.name = Some(name.clone());
        self.cluster.apply(&named).await?;

        // The workload is live at this point; an unconfirmed endpoint is a
        // partial state to report, not a deployment failure.
        let (service_name, service_status, endpoint) =
            match self.cluster.resolve_endpoint(&namespace, &name).await {
                Ok(Some(handle)) => {
                    let endpoint = format!("{name}.{namespace}.{}", self.config.cluster_domain);
                    (Some(handle.name), ServiceStatus::Found, Some(endpoint))
                }
                Ok(None) => (None, ServiceStatus::NotFound, None),
                Err(e) => {
                    warn!(app_name = %name, error = %e, "endpoint lookup failed after apply");
                    (None, ServiceStatus::NotFound, None)
                }
            };

        Ok(DeployOutcome {
            app_name: name,
            namespace,
            service_name,
            service_status,
            endpoint,
            enable_autoscaling,
            use_spot,
            error: None,
        })
    }

    /// Generate a readable name that is not already taken in the namespace.
    async fn unique_name(&self, namespace: &str) -> DeployResult<String> {
        for _ in 0..self.config.name_attempts.max(1) {
            let candidate = names::generate_name();
            if self.cluster.get(namespace, &candidate).await?.is_none() {
                return Ok(candidate);
            }
        }

        warn!(namespace = %namespace, "readable name candidates exhausted, using fallback");
        Ok(names::generate_unique_fallback())
    }
}

impl std::fmt::Debug for DeploymentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
