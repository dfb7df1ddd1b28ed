//! Directional security rules for security groups.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::graph::NodeId;
use crate::types::{AttrValue, Cidr, RefAttr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    /// All protocols, for unrestricted egress. Rendered as `all`; providers
    /// that use `-1` for this translate at declare time.
    All,
}

/// Where traffic matched by a rule may come from or go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSource {
    Cidr(Cidr),
    /// Another security group in the same graph. The only ingress source a
    /// workload group accepts: inbound traffic stays behind the balancer.
    Group(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub direction: Direction,
    pub port_range: (u16, u16),
    pub protocol: Protocol,
    pub source: RuleSource,
}

impl SecurityRule {
    pub fn ingress(port_range: (u16, u16), protocol: Protocol, source: RuleSource) -> Self {
        SecurityRule {
            direction: Direction::Ingress,
            port_range,
            protocol,
            source,
        }
    }

    pub fn egress(port_range: (u16, u16), protocol: Protocol, source: RuleSource) -> Self {
        SecurityRule {
            direction: Direction::Egress,
            port_range,
            protocol,
            source,
        }
    }

    /// The referenced security group, if the source is a group rather than a
    /// CIDR block.
    pub fn source_group(&self) -> Option<NodeId> {
        match self.source {
            RuleSource::Group(id) => Some(id),
            RuleSource::Cidr(_) => None,
        }
    }

    /// Render as a node attribute map for the provider.
    pub fn to_attr(&self) -> AttrValue {
        let source = match self.source {
            RuleSource::Cidr(cidr) => (
                "cidr_blocks",
                AttrValue::List(vec![AttrValue::Str(cidr.to_string())]),
            ),
            RuleSource::Group(id) => (
                "source_security_group_id",
                AttrValue::reference(id, RefAttr::Id),
            ),
        };
        AttrValue::map([
            ("from_port", AttrValue::from(self.port_range.0)),
            ("to_port", AttrValue::from(self.port_range.1)),
            ("protocol", AttrValue::Str(self.protocol.to_string())),
            source,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn test_cidr_rule_renders_cidr_blocks() {
        let rule = SecurityRule::ingress((80, 80), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY));
        let json = serde_json::to_value(rule.to_attr()).unwrap();
        assert_eq!(json["from_port"], 80);
        assert_eq!(json["protocol"], "tcp");
        assert_eq!(json["cidr_blocks"][0], "0.0.0.0/0");
        assert!(rule.source_group().is_none());
    }

    #[test]
    fn test_group_rule_renders_reference() {
        let sg = NodeId::from_index(7);
        let rule = SecurityRule::ingress((3000, 3000), Protocol::Tcp, RuleSource::Group(sg));
        let json = serde_json::to_value(rule.to_attr()).unwrap();
        assert_eq!(json["source_security_group_id"]["$ref"]["node"], 7);
        assert_eq!(rule.source_group(), Some(sg));
    }
}
