//! The resource dependency graph.
//!
//! The graph owns its nodes in an arena; a [`NodeId`] is an ordering-only
//! back-reference into it. Ids are only handed out by [`StackGraph::add`],
//! so every dependency edge points at an already-inserted node and the graph
//! is acyclic by construction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{AttrValue, ResourceKind};

/// Typed index of a node within its graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A declared unit of infrastructure: a kind, a logical name unique within
/// the stack, provider-facing attributes, and the dependency edges the
/// provider must respect when applying the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub logical_name: String,
    pub attrs: BTreeMap<String, AttrValue>,
    pub depends_on: Vec<NodeId>,
}

impl ResourceNode {
    pub fn new(kind: ResourceKind, logical_name: impl Into<String>) -> Self {
        ResourceNode {
            kind,
            logical_name: logical_name.into(),
            attrs: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, dep: NodeId) -> Self {
        self.depends_on.push(dep);
        self
    }
}

/// The complete set of resource nodes produced by one synthesis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackGraph {
    nodes: Vec<ResourceNode>,
}

impl StackGraph {
    pub fn new() -> Self {
        StackGraph::default()
    }

    /// Insert a node and return its id. Logical names are unique per graph;
    /// inserting a duplicate is a builder defect and panics.
    pub fn add(&mut self, node: ResourceNode) -> NodeId {
        assert!(
            !self.nodes.iter().any(|n| n.logical_name == node.logical_name),
            "duplicate logical name `{}`",
            node.logical_name
        );
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &ResourceNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ResourceNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn find(&self, kind: ResourceKind, logical_name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.kind == kind && n.logical_name == logical_name)
            .map(NodeId)
    }

    pub fn of_kind(&self, kind: ResourceKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == kind)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Deterministic topological order: Kahn's algorithm, breaking ties by
    /// insertion index so identical graphs always order identically.
    pub fn topo_order(&self) -> Vec<NodeId> {
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.depends_on {
                indegree[i] += 1;
                dependents[dep.0].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(i) = ready.pop_first() {
            order.push(NodeId(i));
            for &dependent in &dependents[i] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        debug_assert_eq!(order.len(), self.nodes.len());
        order
    }
}
