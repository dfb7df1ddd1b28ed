use std::collections::HashMap;

use super::*;
use crate::config::keys;
use crate::provider::StaticFacts;

mod policies;

pub(crate) fn base_source(name: &str) -> HashMap<String, String> {
    HashMap::from([
        (keys::REGION.to_string(), "us-east-1".to_string()),
        (keys::ACCESS_KEY_ID.to_string(), "AKIAEXAMPLE".to_string()),
        (keys::SECRET_ACCESS_KEY.to_string(), "secret".to_string()),
        (keys::REPOSITORY_NAME.to_string(), name.to_string()),
    ])
}

pub(crate) fn config_for(name: &str, topology: &str) -> StackConfig {
    let mut source = base_source(name);
    source.insert(keys::TOPOLOGY.to_string(), topology.to_string());
    StackConfig::resolve(&source).unwrap()
}

pub(crate) fn facts() -> StaticFacts {
    StaticFacts::new("123456789012", &["us-east-1a", "us-east-1b"]).unwrap()
}

pub(crate) fn acme_stack() -> Stack {
    synthesize(&config_for("acme", "full"), &facts()).unwrap()
}

#[test]
fn test_acme_scenario_succeeds_with_expected_shape() {
    let stack = acme_stack();

    assert_eq!(
        stack.outputs.require("ecr-repository-name").unwrap().value,
        AttrValue::from("acme")
    );

    let lb_sg = stack
        .graph
        .find(crate::types::ResourceKind::SecurityGroup, "acme-alb-sg")
        .unwrap();
    let service_sg = stack
        .graph
        .find(crate::types::ResourceKind::SecurityGroup, "acme-service-sg")
        .unwrap();

    let ingress = match &stack.graph.get(service_sg).attrs["ingress"] {
        AttrValue::List(rules) => rules.clone(),
        other => panic!("ingress is not a list: {other:?}"),
    };
    assert_eq!(ingress.len(), 1);
    let rule = serde_json::to_value(&ingress[0]).unwrap();
    assert_eq!(rule["from_port"], 3000);
    assert_eq!(rule["to_port"], 3000);
    assert_eq!(
        rule["source_security_group_id"]["$ref"]["node"],
        lb_sg.index()
    );
}

#[test]
fn test_identical_config_synthesizes_identical_stacks() {
    let config = config_for("acme", "full");
    let first = synthesize(&config, &facts()).unwrap();
    let second = synthesize(&config, &facts()).unwrap();
    assert_eq!(first.graph, second.graph);
    assert_eq!(first.outputs, second.outputs);
}

#[test]
fn test_missing_region_fails_before_any_node_exists() {
    let mut source = base_source("acme");
    source.remove(keys::REGION);
    // Resolution is the gate: no StackConfig, no builder ever runs.
    assert_eq!(
        StackConfig::resolve(&source),
        Err(SynthError::MissingRequiredConfig {
            key: keys::REGION.to_string()
        })
    );
}

#[test]
fn test_single_zone_region_is_fatal() {
    let facts = StaticFacts::new("123456789012", &["us-east-1a"]).unwrap();
    let result = synthesize(&config_for("acme", "full"), &facts);
    assert_eq!(
        result.unwrap_err(),
        SynthError::InsufficientAvailabilityZones {
            region: "us-east-1".to_string(),
            found: 1,
        }
    );
}

#[test]
fn test_extra_zones_beyond_two_are_ignored() {
    let facts = StaticFacts::new(
        "123456789012",
        &["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d"],
    )
    .unwrap();
    let stack = synthesize(&config_for("acme", "full"), &facts).unwrap();
    assert_eq!(
        stack
            .graph
            .of_kind(crate::types::ResourceKind::Subnet)
            .len(),
        2
    );
}

#[test]
fn test_registry_topology_builds_no_network_or_compute() {
    use crate::types::ResourceKind;

    let stack = synthesize(&config_for("acme", "registry"), &facts()).unwrap();
    for kind in [
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::SecurityGroup,
        ResourceKind::Cluster,
        ResourceKind::Service,
        ResourceKind::LoadBalancer,
    ] {
        assert!(stack.graph.of_kind(kind).is_empty(), "unexpected {kind}");
    }
    assert_eq!(stack.graph.of_kind(ResourceKind::Registry).len(), 1);
    assert_eq!(stack.graph.of_kind(ResourceKind::Role).len(), 1);
    assert_eq!(stack.graph.of_kind(ResourceKind::Policy).len(), 1);
}

#[test]
fn test_compute_topology_omits_load_balancer_tier() {
    use crate::types::ResourceKind;

    let stack = synthesize(&config_for("acme", "compute"), &facts()).unwrap();
    for kind in [
        ResourceKind::LoadBalancer,
        ResourceKind::TargetGroup,
        ResourceKind::Listener,
        ResourceKind::ListenerRule,
    ] {
        assert!(stack.graph.of_kind(kind).is_empty(), "unexpected {kind}");
    }

    let service = stack
        .graph
        .find(ResourceKind::Service, "acme-service")
        .unwrap();
    assert!(!stack.graph.get(service).attrs.contains_key("load_balancer"));
}

#[test]
fn test_subnet_blocks_are_disjoint_and_inside_the_vpc() {
    use crate::types::{Cidr, ResourceKind};

    let stack = acme_stack();
    let block_of = |id| match &stack.graph.get(id).attrs["cidr_block"] {
        AttrValue::Str(raw) => raw.parse::<Cidr>().unwrap(),
        other => panic!("cidr_block is not a string: {other:?}"),
    };

    let vpc = stack.graph.find(ResourceKind::Network, "acme-vpc").unwrap();
    let vpc_block = block_of(vpc);
    let subnet_blocks: Vec<Cidr> = stack
        .graph
        .of_kind(ResourceKind::Subnet)
        .into_iter()
        .map(block_of)
        .collect();

    assert_eq!(subnet_blocks.len(), 2);
    for (i, block) in subnet_blocks.iter().enumerate() {
        assert!(vpc_block.contains(block));
        for other in &subnet_blocks[i + 1..] {
            assert!(!block.overlaps(other));
        }
    }
}

#[test]
fn test_every_reference_points_at_an_existing_node() {
    let stack = acme_stack();
    let len = stack.graph.len();
    for (_, node) in stack.graph.nodes() {
        for value in node.attrs.values() {
            for referenced in value.referenced_nodes() {
                assert!(referenced.index() < len);
            }
        }
        for dep in &node.depends_on {
            assert!(dep.index() < len);
        }
    }
}
