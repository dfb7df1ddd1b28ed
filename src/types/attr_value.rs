//! Attribute values for resource nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Which declared attribute of a node a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefAttr {
    Id,
    Arn,
    DnsName,
}

/// The target of a cross-resource reference: a node in the same graph and
/// the attribute of it the provider should substitute at declare time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTarget {
    pub node: NodeId,
    pub attr: RefAttr,
}

/// Attribute values that can be attached to resource nodes.
///
/// `Ref` and `Concat` replace stringly-typed ARN interpolation: a reference
/// names its target node by id, so an unresolvable reference is a
/// construction-time error rather than a malformed string handed to the
/// provider. Values known at synthesis time stay literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttrValue>),
    Ref {
        #[serde(rename = "$ref")]
        target: RefTarget,
    },
    Concat {
        #[serde(rename = "$concat")]
        parts: Vec<AttrValue>,
    },
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// A reference to `attr` of `node`, resolved by the provider.
    pub fn reference(node: NodeId, attr: RefAttr) -> Self {
        AttrValue::Ref {
            target: RefTarget { node, attr },
        }
    }

    /// String concatenation of literals and references.
    pub fn concat<I: IntoIterator<Item = AttrValue>>(parts: I) -> Self {
        AttrValue::Concat {
            parts: parts.into_iter().collect(),
        }
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttrValue)>,
    {
        AttrValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// The nodes this value references, directly or nested.
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        match self {
            AttrValue::Ref { target } => vec![target.node],
            AttrValue::Concat { parts } | AttrValue::List(parts) => {
                parts.iter().flat_map(AttrValue::referenced_nodes).collect()
            }
            AttrValue::Map(entries) => entries
                .values()
                .flat_map(AttrValue::referenced_nodes)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(v: Vec<AttrValue>) -> Self {
        AttrValue::List(v)
    }
}
