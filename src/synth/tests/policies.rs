//! Security-group layering and least-privilege properties.

use insta::assert_snapshot;

use super::*;
use crate::graph::NodeId;
use crate::synth::security::{
    deploy_policy, deploy_trust_policy, execution_policy, pull_policy,
    registry_access_policy, registry_trust_policy, task_trust_policy, workload_rules,
};
use crate::types::{Direction, ResourceKind};

const LOG_ARN: &str = "arn:aws:logs:us-east-1:123456789012:log-group:/ecs/acme:*";

#[test]
fn test_workload_ingress_is_sourced_from_the_balancer_group_only() {
    let lb_sg = NodeId::from_index(4);
    let rules = workload_rules(3000, Some(lb_sg));

    let ingress: Vec<_> = rules
        .iter()
        .filter(|r| r.direction == Direction::Ingress)
        .collect();
    assert_eq!(ingress.len(), 1);
    assert_eq!(ingress[0].port_range, (3000, 3000));
    assert_eq!(ingress[0].source_group(), Some(lb_sg));
}

#[test]
fn test_synthesized_workload_group_has_no_cidr_ingress() {
    let stack = acme_stack();
    let service_sg = stack
        .graph
        .find(ResourceKind::SecurityGroup, "acme-service-sg")
        .unwrap();

    let ingress = serde_json::to_value(&stack.graph.get(service_sg).attrs["ingress"]).unwrap();
    for rule in ingress.as_array().unwrap() {
        assert!(
            rule.get("cidr_blocks").is_none(),
            "public ingress on the workload group: {rule}"
        );
        assert!(rule.get("source_security_group_id").is_some());
    }
}

#[test]
fn test_compute_workload_ingress_falls_open_without_a_balancer() {
    // No load-balancer tier means no group to source from; the container
    // port opens to the world in the compute topology only.
    let rules = workload_rules(3000, None);
    let ingress: Vec<_> = rules
        .iter()
        .filter(|r| r.direction == Direction::Ingress)
        .collect();
    assert_eq!(ingress.len(), 1);
    assert!(ingress[0].source_group().is_none());

    let stack = synthesize(&config_for("acme", "compute"), &facts()).unwrap();
    let service_sg = stack
        .graph
        .find(ResourceKind::SecurityGroup, "acme-service-sg")
        .unwrap();
    let ingress = serde_json::to_value(&stack.graph.get(service_sg).attrs["ingress"]).unwrap();
    let rules = ingress.as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["from_port"], 3000);
    assert_eq!(rules[0]["to_port"], 3000);
    assert_eq!(rules[0]["cidr_blocks"][0], "0.0.0.0/0");
    assert!(rules[0].get("source_security_group_id").is_none());
}

#[test]
fn test_balancer_group_admits_the_public_web_ports() {
    let stack = acme_stack();
    let lb_sg = stack
        .graph
        .find(ResourceKind::SecurityGroup, "acme-alb-sg")
        .unwrap();

    let ingress = serde_json::to_value(&stack.graph.get(lb_sg).attrs["ingress"]).unwrap();
    let ports: Vec<i64> = ingress
        .as_array()
        .unwrap()
        .iter()
        .map(|rule| {
            assert_eq!(rule["cidr_blocks"][0], "0.0.0.0/0");
            rule["from_port"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(ports, vec![80, 443]);
}

#[test]
fn test_access_role_is_pull_only() {
    let repository = NodeId::from_index(0);
    assert_eq!(
        pull_policy(repository).action_names(),
        vec![
            "ecr:BatchCheckLayerAvailability",
            "ecr:BatchGetImage",
            "ecr:GetDownloadUrlForLayer",
        ]
    );
}

#[test]
fn test_registry_topology_role_also_pushes() {
    let repository = NodeId::from_index(0);
    let actions = registry_access_policy(repository).action_names();
    assert!(actions.contains(&"ecr:PutImage".to_string()));
    assert!(actions.contains(&"ecr:GetAuthorizationToken".to_string()));
    assert!(actions.contains(&"ecr:BatchGetImage".to_string()));
}

#[test]
fn test_execution_role_wildcard_is_limited_to_token_retrieval() {
    let doc = execution_policy(LOG_ARN);
    let json = serde_json::to_value(&doc).unwrap();

    for statement in json["Statement"].as_array().unwrap() {
        if statement["Resource"] == "*" {
            // The only resource-wildcard action is the token call, which has
            // no resource-level permissions at the provider.
            assert_eq!(statement["Action"], "ecr:GetAuthorizationToken");
        } else {
            assert_eq!(statement["Resource"], LOG_ARN);
        }
    }
}

#[test]
fn test_deploy_role_hands_off_exactly_the_two_runtime_roles() {
    let access = "arn:aws:iam::123456789012:role/acme-ecr-role";
    let execution = "arn:aws:iam::123456789012:role/acme-execution-role";
    let doc = deploy_policy(NodeId::from_index(0), access, execution, LOG_ARN);
    let json = serde_json::to_value(&doc).unwrap();

    let pass_role = json["Statement"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["Sid"] == "HandOffRoles")
        .unwrap();
    assert_eq!(pass_role["Action"], "iam:PassRole");
    assert_eq!(
        pass_role["Resource"],
        serde_json::json!([access, execution])
    );
}

#[test]
fn test_trust_policies_pin_the_region() {
    let account = crate::provider::AccountId::new("123456789012").unwrap();
    for doc in [
        task_trust_policy("eu-west-1"),
        registry_trust_policy(&account, "eu-west-1"),
        deploy_trust_policy(&account, "eu-west-1"),
    ] {
        let json = serde_json::to_value(&doc).unwrap();
        for statement in json["Statement"].as_array().unwrap() {
            assert_eq!(statement["Action"], "sts:AssumeRole");
            assert_eq!(
                statement["Condition"]["StringEquals"]["aws:RequestedRegion"],
                "eu-west-1"
            );
        }
    }
}

#[test]
fn test_deploy_trust_restricts_to_the_account_root() {
    let account = crate::provider::AccountId::new("123456789012").unwrap();
    let json = serde_json::to_value(&deploy_trust_policy(&account, "us-east-1")).unwrap();
    assert_eq!(
        json["Statement"][0]["Principal"]["AWS"],
        "arn:aws:iam::123456789012:root"
    );
}

#[test]
fn test_execution_policy_wire_form() {
    let doc = execution_policy(LOG_ARN);
    assert_snapshot!(serde_json::to_string_pretty(&doc).unwrap(), @r#"
    {
      "Statement": [
        {
          "Action": "ecr:GetAuthorizationToken",
          "Effect": "Allow",
          "Resource": "*",
          "Sid": "GetAuthToken"
        },
        {
          "Action": [
            "logs:CreateLogStream",
            "logs:PutLogEvents"
          ],
          "Effect": "Allow",
          "Resource": "arn:aws:logs:us-east-1:123456789012:log-group:/ecs/acme:*",
          "Sid": "WriteLogs"
        }
      ],
      "Version": "2012-10-17"
    }
    "#);
}

#[test]
fn test_role_policies_follow_the_resources_they_reference() {
    let stack = acme_stack();
    let repository = stack
        .graph
        .find(ResourceKind::Registry, "acme-registry")
        .unwrap();
    let policy = stack
        .graph
        .find(ResourceKind::Policy, "acme-ecr-policy")
        .unwrap();
    assert!(stack.graph.get(policy).depends_on.contains(&repository));
}
