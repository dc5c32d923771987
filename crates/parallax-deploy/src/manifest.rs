//! Target workload specification synthesis.
//!
//! [`synthesize`] merges a deploy request into a complete [`TargetSpec`].
//! The merge is pure and deterministic: the same request always produces
//! the same spec, byte-identical once serialized. That property is what
//! makes re-deploys idempotent and the output directly comparable in tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};
use crate::names;

/// Label applied to every synthesized workload.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of the managed-by marker.
pub const MANAGED_BY_VALUE: &str = "parallax";

/// Label carrying the caller's function id, when supplied.
pub const FUNCTION_ID_LABEL: &str = "parallax.dev/function-id";

/// A request to deploy a pushed image as a workload.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployRequest {
    /// Target namespace.
    pub namespace: String,
    /// Reference of the image to run.
    pub image_ref: String,
    /// Workload name. When present it drives the create-vs-update decision;
    /// when absent the resolver generates a unique name.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Function id, attached as a workload label when non-empty.
    #[serde(default)]
    pub function_id: Option<String>,
    /// Whether to emit an autoscaling policy.
    #[serde(default = "default_true")]
    pub enable_autoscaling: bool,
    /// Fixed replica count. Only honored when autoscaling is disabled.
    #[serde(default)]
    pub replicas: Option<u32>,
    /// Whether to attach the spot scheduling preference.
    #[serde(default = "default_true")]
    pub use_spot: bool,
    /// CPU limit, passed through verbatim.
    #[serde(default)]
    pub cpu_limit: Option<String>,
    /// Memory limit, passed through verbatim.
    #[serde(default)]
    pub memory_limit: Option<String>,
    /// CPU request, passed through verbatim.
    #[serde(default)]
    pub cpu_request: Option<String>,
    /// Memory request, passed through verbatim.
    #[serde(default)]
    pub memory_request: Option<String>,
    /// Service account to run the workload under.
    #[serde(default)]
    pub service_account: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            image_ref: String::new(),
            app_name: None,
            function_id: None,
            enable_autoscaling: true,
            replicas: None,
            use_spot: true,
            cpu_limit: None,
            memory_limit: None,
            cpu_request: None,
            memory_request: None,
            service_account: None,
        }
    }
}

/// Scaling policy for a workload. Autoscaling and a fixed replica count are
/// mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScalingPolicy {
    /// Autoscaling with a lower bound.
    Autoscale {
        /// Minimum number of replicas.
        min_replicas: u32,
    },
    /// Fixed replica count.
    Fixed {
        /// Number of replicas.
        replicas: u32,
    },
}

impl ScalingPolicy {
    /// Check whether this policy autoscales.
    #[must_use]
    pub const fn is_autoscaling(&self) -> bool {
        matches!(self, Self::Autoscale { .. })
    }
}

/// A scheduling toleration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    /// Taint key.
    pub key: String,
    /// Match operator.
    pub operator: String,
    /// Taint effect.
    pub effect: String,
}

/// A single preferred node affinity term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredNodeTerm {
    /// Preference weight.
    pub weight: i32,
    /// Node label key to match.
    pub key: String,
    /// Match operator.
    pub operator: String,
    /// Values to match against.
    pub values: Vec<String>,
}

/// Soft scheduling preference for spot capacity.
///
/// The affinity term is *preferred*, never required: a workload with this
/// hint still schedules onto on-demand capacity when no spot capacity is
/// available. Emitting a hard node-affinity rule here would strand
/// workloads in a pending state whenever spot capacity runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotPreference {
    /// Toleration for the spot taint.
    pub toleration: Toleration,
    /// Preferred affinity towards spot-labelled nodes.
    pub affinity: PreferredNodeTerm,
}

impl SpotPreference {
    /// The default spot hint: tolerate the `spot` taint and prefer nodes
    /// labelled `spot=true` with weight 100.
    #[must_use]
    pub fn hint() -> Self {
        Self {
            toleration: Toleration {
                key: "spot".to_owned(),
                operator: "Exists".to_owned(),
                effect: "NoSchedule".to_owned(),
            },
            affinity: PreferredNodeTerm {
                weight: 100,
                key: "spot".to_owned(),
                operator: "In".to_owned(),
                values: vec!["true".to_owned()],
            },
        }
    }
}

/// Resource limits and requests, passed through verbatim.
///
/// No defaults are injected here; defaulting, if any, belongs to the
/// cluster's own admission policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    /// Memory limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
    /// CPU request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,
    /// Memory request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,
}

impl ResourceSpec {
    /// Check if any resource value is set.
    #[must_use]
    pub const fn has_any(&self) -> bool {
        self.cpu_limit.is_some()
            || self.memory_limit.is_some()
            || self.cpu_request.is_some()
            || self.memory_request.is_some()
    }
}

/// Fully merged workload specification, ready for cluster apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Workload name. `None` until the resolver assigns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Target namespace.
    pub namespace: String,
    /// Image reference.
    pub image: String,
    /// Workload labels. Ordered so equal specs serialize byte-identically.
    pub labels: BTreeMap<String, String>,
    /// Scaling policy.
    pub scaling: ScalingPolicy,
    /// Spot scheduling hint, absent when spot is not requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SpotPreference>,
    /// Resource limits and requests, absent when none are supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSpec>,
    /// Service account, absent when not supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
}

/// Merge a deploy request into a complete target specification.
///
/// Pure and total over well-formed input. Rejects empty namespace or image,
/// a replica count combined with autoscaling, malformed workload names and
/// malformed resource quantities — all before any cluster call is made.
pub fn synthesize(request: &DeployRequest) -> DeployResult<TargetSpec> {
    if request.namespace.trim().is_empty() {
        return Err(DeployError::validation("namespace must not be empty"));
    }
    if request.image_ref.trim().is_empty() {
        return Err(DeployError::validation("image_ref must not be empty"));
    }
    if request.enable_autoscaling && request.replicas.is_some() {
        return Err(DeployError::ScalingConflict(
            "replicas cannot be combined with autoscaling; disable autoscaling to pin a replica count"
                .to_owned(),
        ));
    }
    if let Some(name) = &request.app_name {
        names::validate_name(name)?;
    }
    for (field, value) in [
        ("cpu_limit", &request.cpu_limit),
        ("memory_limit", &request.memory_limit),
        ("cpu_request", &request.cpu_request),
        ("memory_request", &request.memory_request),
    ] {
        if let Some(value) = value {
            validate_quantity(field, value)?;
        }
    }

    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_owned(), MANAGED_BY_VALUE.to_owned());
    if let Some(function_id) = request.function_id.as_deref() {
        if !function_id.is_empty() {
            labels.insert(FUNCTION_ID_LABEL.to_owned(), function_id.to_owned());
        }
    }

    let scaling = if request.enable_autoscaling {
        ScalingPolicy::Autoscale { min_replicas: 1 }
    } else {
        ScalingPolicy::Fixed {
            replicas: request.replicas.unwrap_or(1).max(1),
        }
    };

    let resources = ResourceSpec {
        cpu_limit: request.cpu_limit.clone(),
        memory_limit: request.memory_limit.clone(),
        cpu_request: request.cpu_request.clone(),
        memory_request: request.memory_request.clone(),
    };

    Ok(TargetSpec {
        name: request.app_name.clone(),
        namespace: request.namespace.clone(),
        image: request.image_ref.clone(),
        labels,
        scaling,
        scheduling: request.use_spot.then(SpotPreference::hint),
        resources: resources.has_any().then_some(resources),
        service_account: request.service_account.clone(),
    })
}

/// Validate a resource quantity (`100m`, `128Mi`, `1.5Gi`, `2`, ...).
fn validate_quantity(field: &str, value: &str) -> DeployResult<()> {
    if is_valid_quantity(value) {
        Ok(())
    } else {
        Err(DeployError::validation(format!(
            "invalid resource format for {field}: '{value}', expected something like '100m', '128Mi' or '1Gi'"
        )))
    }
}

fn is_valid_quantity(value: &str) -> bool {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    if digits_end == 0 {
        return false;
    }

    let mut rest = &value[digits_end..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let frac_end = fraction
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(fraction.len());
        if frac_end == 0 {
            return false;
        }
        rest = &fraction[frac_end..];
    }

    matches!(
        rest,
        "" | "m" | "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" | "k" | "M" | "G" | "T" | "P" | "E"
    )
}
