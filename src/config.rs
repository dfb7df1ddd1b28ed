//! Configuration resolution.
//!
//! The resolver consumes an injected key/value source (environment, file,
//! CLI — the core does not care) and produces an immutable [`StackConfig`].
//! Every required-key check runs here, before any resource node exists.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::error::SynthError;

/// Recognized configuration keys. The names are part of the external
/// interface; callers backed by a process environment pass them through
/// verbatim.
pub mod keys {
    pub const REGION: &str = "AWS_DEFAULT_REGION";
    pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const REPOSITORY_NAME: &str = "ECR_REPOSITORY_NAME";
    pub const IMAGE_TAG_MUTABILITY: &str = "ECR_IMAGE_TAG_MUTABILITY";
    pub const SCAN_ON_PUSH: &str = "ECR_SCAN_ON_PUSH";
    pub const IMAGE_TAG: &str = "IMAGE_TAG";
    pub const CONTAINER_PORT: &str = "CONTAINER_PORT";
    pub const TOPOLOGY: &str = "STACK_TOPOLOGY";
    pub const HEALTH_CHECK_PATH: &str = "HEALTH_CHECK_PATH";
    pub const HEALTH_CHECK_COMMAND: &str = "HEALTH_CHECK_COMMAND";
}

const DEFAULT_NAME: &str = "tv-devops-assessment";
const DEFAULT_IMAGE_TAG: &str = "latest";
const DEFAULT_CONTAINER_PORT: &str = "3000";
const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";

/// A flat string-keyed configuration source, injected by the caller.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TagMutability {
    Mutable,
    Immutable,
}

/// Which tiers of the stack a synthesis pass includes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Topology {
    /// Container registry and its access role only.
    Registry,
    /// Registry plus network and compute cluster, no load balancer.
    Compute,
    /// The complete stack including the load-balancing tier.
    Full,
}

impl Topology {
    pub fn has_compute(self) -> bool {
        matches!(self, Topology::Compute | Topology::Full)
    }

    pub fn has_load_balancer(self) -> bool {
        matches!(self, Topology::Full)
    }
}

/// Resolved, validated configuration. Immutable input to every builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Namespacing prefix for every derived resource name. Never empty.
    pub name: String,
    pub image_tag_mutability: TagMutability,
    pub scan_on_push: bool,
    pub image_tag: String,
    pub container_port: u16,
    pub region: String,
    pub topology: Topology,
    pub health_check_path: String,
    /// The workload's own periodic probe command.
    pub health_check_command: Vec<String>,
}

impl StackConfig {
    /// Validate, default, and coerce raw configuration.
    ///
    /// The access-identity keys are checked for presence but never stored;
    /// credential handling belongs to the caller.
    pub fn resolve(source: &dyn ConfigSource) -> Result<Self, SynthError> {
        let region = required(source, keys::REGION)?;
        required(source, keys::ACCESS_KEY_ID)?;
        required(source, keys::SECRET_ACCESS_KEY)?;

        let name = optional(source, keys::REPOSITORY_NAME, DEFAULT_NAME);
        if name.trim().is_empty() {
            return Err(SynthError::InvalidConfig {
                key: keys::REPOSITORY_NAME.to_string(),
                reason: "stack name must not be empty".to_string(),
            });
        }

        let image_tag_mutability = parse_enum(source, keys::IMAGE_TAG_MUTABILITY, TagMutability::Mutable)?;
        let topology = parse_enum(source, keys::TOPOLOGY, Topology::Full)?;
        let scan_on_push = source
            .get(keys::SCAN_ON_PUSH)
            .map(|v| v == "true")
            .unwrap_or(false);
        let image_tag = optional(source, keys::IMAGE_TAG, DEFAULT_IMAGE_TAG);
        let container_port = resolve_port(source)?;

        let health_check_path = optional(source, keys::HEALTH_CHECK_PATH, DEFAULT_HEALTH_CHECK_PATH);
        if !health_check_path.starts_with('/') {
            return Err(SynthError::InvalidConfig {
                key: keys::HEALTH_CHECK_PATH.to_string(),
                reason: format!("`{health_check_path}` must start with `/`"),
            });
        }
        let health_check_command = match source.get(keys::HEALTH_CHECK_COMMAND) {
            Some(command) if !command.trim().is_empty() => {
                vec!["CMD-SHELL".to_string(), command]
            }
            _ => vec![
                "CMD-SHELL".to_string(),
                format!(
                    "curl -f http://localhost:{container_port}{health_check_path} || exit 1"
                ),
            ],
        };

        let config = StackConfig {
            name,
            image_tag_mutability,
            scan_on_push,
            image_tag,
            container_port,
            region,
            topology,
            health_check_path,
            health_check_command,
        };
        debug!(
            event = "Config",
            phase = "Resolved",
            name = config.name,
            region = config.region,
            topology = %config.topology,
            container_port = config.container_port
        );
        Ok(config)
    }
}

fn required(source: &dyn ConfigSource, key: &str) -> Result<String, SynthError> {
    match source.get(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SynthError::MissingRequiredConfig {
            key: key.to_string(),
        }),
    }
}

fn optional(source: &dyn ConfigSource, key: &str, default: &str) -> String {
    source
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_enum<T: FromStr>(
    source: &dyn ConfigSource,
    key: &str,
    default: T,
) -> Result<T, SynthError> {
    match source.get(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| SynthError::InvalidConfig {
                key: key.to_string(),
                reason: format!("unrecognized value `{raw}`"),
            })
        }
        _ => Ok(default),
    }
}

/// Port coercion. A present-but-zero port is rejected rather than silently
/// replaced with the default; 0 is never a port a container can listen on,
/// so treating it as "unset" would hide a real misconfiguration.
fn resolve_port(source: &dyn ConfigSource) -> Result<u16, SynthError> {
    let raw = optional(source, keys::CONTAINER_PORT, DEFAULT_CONTAINER_PORT);
    let port: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SynthError::InvalidConfig {
            key: keys::CONTAINER_PORT.to_string(),
            reason: format!("`{raw}` is not an integer"),
        })?;
    if !(1..=i64::from(u16::MAX)).contains(&port) {
        return Err(SynthError::InvalidConfig {
            key: keys::CONTAINER_PORT.to_string(),
            reason: format!("port {port} is outside 1..=65535"),
        });
    }
    Ok(port as u16)
}
