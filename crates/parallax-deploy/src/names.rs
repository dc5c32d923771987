//! Workload name validation and generation.

use crate::error::{DeployError, DeployResult};

/// Maximum workload name length accepted by the cluster.
pub const MAX_NAME_LEN: usize = 63;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clear", "deep", "dusky", "eager", "fleet", "fresh",
    "gentle", "glad", "golden", "hazy", "iron", "jade", "keen", "late", "lunar", "mellow",
    "mild", "nimble", "opal", "pale", "proud", "quiet", "rapid", "solar", "still", "tidal",
    "vivid", "warm",
];

const NOUNS: &[&str] = &[
    "basin", "bay", "beacon", "bloom", "breeze", "brook", "cliff", "cloud", "comet", "crane",
    "delta", "drift", "dune", "ember", "falcon", "fern", "field", "glade", "grove", "harbor",
    "heron", "lake", "meadow", "orbit", "otter", "pine", "reef", "ridge", "river", "spark",
    "summit", "wren",
];

/// Validate a caller-supplied workload name.
///
/// Names must be lowercase alphanumeric with hyphens, start and end with an
/// alphanumeric character, and fit in [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> DeployResult<()> {
    if name.is_empty() {
        return Err(DeployError::validation("app_name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DeployError::validation(format!(
            "app_name must be at most {MAX_NAME_LEN} characters, got {}",
            name.len()
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(DeployError::validation(format!(
            "app_name '{name}' must contain only lowercase alphanumeric characters and hyphens"
        )));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(DeployError::validation(format!(
            "app_name '{name}' must start and end with an alphanumeric character"
        )));
    }
    Ok(())
}

/// Generate a human-readable workload name.
///
/// Names have the shape `plx-{adjective}-{noun}-{number}` with entropy drawn
/// from a fresh ULID. Callers that need cluster-wide uniqueness must still
/// check for an existing workload of the same name and regenerate.
#[must_use]
pub fn generate_name() -> String {
    let entropy = u128::from(ulid::Ulid::new());

    let adjective = ADJECTIVES[(entropy % ADJECTIVES.len() as u128) as usize];
    let noun = NOUNS[((entropy >> 16) % NOUNS.len() as u128) as usize];
    let number = 1000 + ((entropy >> 40) % 9000) as u64;

    format!("plx-{adjective}-{noun}-{number}")
}

/// Generate a name that cannot collide, at the cost of readability.
///
/// Used as a fallback when the readable namespace is saturated.
#[must_use]
pub fn generate_unique_fallback() -> String {
    format!("plx-{}", ulid::Ulid::new().to_string().to_lowercase())
}
