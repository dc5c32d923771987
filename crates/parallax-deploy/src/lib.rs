//! Parallax deployment layer.
//!
//! Two cooperating pieces sit behind the pipeline:
//!
//! - **Manifest synthesis** ([`manifest::synthesize`]): merges a
//!   [`DeployRequest`] into a complete, deterministic [`TargetSpec`] —
//!   labels, scaling policy, spot scheduling hint, resource blocks. Equal
//!   requests always produce byte-identical specs.
//! - **Deployment resolution** ([`DeploymentResolver`]): decides whether a
//!   spec creates a new workload or rolls an existing one forward, names
//!   the workload, applies it through the injected [`ClusterClient`] and
//!   reports the resulting endpoint.
//!
//! Validation happens entirely at synthesis time, before any cluster call;
//! the resolver only ever sees well-formed specs.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;
pub mod manifest;
pub mod names;
pub mod resolver;

pub use cluster::{ClusterClient, MockClusterClient, ServiceHandle, Workload};
pub use error::{DeployError, DeployResult};
pub use manifest::{
    synthesize, DeployRequest, PreferredNodeTerm, ResourceSpec, ScalingPolicy, SpotPreference,
    TargetSpec, Toleration, FUNCTION_ID_LABEL, MANAGED_BY_LABEL, MANAGED_BY_VALUE,
};
pub use resolver::{DeployOutcome, DeploymentResolver, ResolverConfig, ServiceStatus};
