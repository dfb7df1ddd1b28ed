use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Synthesis failures. All variants are fatal: either a full stack graph is
/// produced, or synthesis aborts with one of these naming the offending
/// configuration key or resource reference.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthError {
    #[error("required configuration key `{key}` is missing or empty")]
    MissingRequiredConfig { key: String },

    #[error("invalid value for configuration key `{key}`: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("region {region} returned {found} availability zone(s), the topology requires at least 2")]
    InsufficientAvailabilityZones { region: String, found: usize },

    #[error("unresolvable resource reference: {0}")]
    InvalidReference(String),

    #[error("output `{0}` was not produced by any builder")]
    MissingOutput(String),

    #[error("output `{0}` was exported more than once")]
    DuplicateOutput(String),
}
