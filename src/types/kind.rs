//! Resource kinds known to the synthesizer.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The closed set of resource kinds a stack graph can contain.
///
/// The provider maps each kind onto its own resource type at declare time;
/// the core only uses kinds for lookups and for readable logs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ResourceKind {
    Network,
    Subnet,
    InternetGateway,
    RouteTable,
    Route,
    RouteTableAssociation,
    SecurityGroup,
    Role,
    Policy,
    Registry,
    Cluster,
    Workload,
    Service,
    LoadBalancer,
    TargetGroup,
    Listener,
    ListenerRule,
    LogGroup,
}
