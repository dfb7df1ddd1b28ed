//! Security tier: security groups and IAM roles with their scoped policies.
//!
//! Two layering rules live here and are preserved as invariants rather than
//! defaults: the workload's only ingress source is the load-balancer
//! security group (never a CIDR), and each role's policy carries only the
//! actions its declared purpose needs.

use tracing::debug;

use crate::config::StackConfig;
use crate::graph::{NodeId, ResourceNode, StackGraph};
use crate::provider::AccountId;
use crate::synth::network::NetworkParts;
use crate::synth::resource_tags;
use crate::synth::workload::log_group_name;
use crate::types::{
    AttrValue, Cidr, Direction, PolicyDocument, PolicyPrincipal, Protocol, RefAttr,
    ResourceKind, RuleSource, SecurityRule, Statement,
};

const PULL_ACTIONS: [&str; 3] = [
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
];

const PUSH_ACTIONS: [&str; 4] = [
    "ecr:PutImage",
    "ecr:InitiateLayerUpload",
    "ecr:UploadLayerPart",
    "ecr:CompleteLayerUpload",
];

pub(crate) struct Groups {
    pub(crate) lb_sg: Option<NodeId>,
    pub(crate) workload_sg: NodeId,
}

pub(crate) struct RoleParts {
    pub(crate) node: NodeId,
    pub(crate) name: String,
    pub(crate) arn: String,
}

pub(crate) struct ComputeRoles {
    pub(crate) access: RoleParts,
    pub(crate) execution: RoleParts,
    pub(crate) deploy: RoleParts,
}

pub(crate) fn role_arn(account: &AccountId, name: &str) -> String {
    format!("arn:aws:iam::{account}:role/{name}")
}

fn log_group_arn(config: &StackConfig, account: &AccountId) -> String {
    format!(
        "arn:aws:logs:{}:{}:log-group:{}:*",
        config.region,
        account,
        log_group_name(config)
    )
}

/// Load balancer: open to the internet on the public web ports.
pub(crate) fn lb_rules() -> Vec<SecurityRule> {
    vec![
        SecurityRule::ingress((80, 80), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY)),
        SecurityRule::ingress((443, 443), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY)),
        SecurityRule::egress((0, 65535), Protocol::All, RuleSource::Cidr(Cidr::ANY)),
    ]
}

/// Workload: inbound only from the balancer, outbound only what pulls,
/// log delivery, and name resolution need.
///
/// Without a load-balancing tier there is no group to source from, so the
/// container port falls open to the world; `Topology::Full` never takes
/// that branch.
pub(crate) fn workload_rules(port: u16, lb_sg: Option<NodeId>) -> Vec<SecurityRule> {
    let ingress_source = match lb_sg {
        Some(sg) => RuleSource::Group(sg),
        None => RuleSource::Cidr(Cidr::ANY),
    };
    vec![
        SecurityRule::ingress((port, port), Protocol::Tcp, ingress_source),
        SecurityRule::egress((443, 443), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY)),
        SecurityRule::egress((80, 80), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY)),
        SecurityRule::egress((53, 53), Protocol::Tcp, RuleSource::Cidr(Cidr::ANY)),
        SecurityRule::egress((53, 53), Protocol::Udp, RuleSource::Cidr(Cidr::ANY)),
    ]
}

pub(crate) fn build_groups(
    config: &StackConfig,
    net: &NetworkParts,
    graph: &mut StackGraph,
) -> Groups {
    let lb_sg = config.topology.has_load_balancer().then(|| {
        add_security_group(
            config,
            graph,
            "alb-sg",
            "Load balancer: public web ports in, anything out",
            net.vpc,
            &lb_rules(),
        )
    });

    let rules = workload_rules(config.container_port, lb_sg);
    let workload_sg = add_security_group(
        config,
        graph,
        "service-sg",
        "Workload: container port in from the load balancer only",
        net.vpc,
        &rules,
    );

    debug!(
        event = "Synthesis",
        phase = "SecurityGroups",
        lb = lb_sg.is_some(),
        workload_ingress_sources = rules
            .iter()
            .filter(|r| r.direction == Direction::Ingress)
            .count()
    );

    Groups { lb_sg, workload_sg }
}

fn add_security_group(
    config: &StackConfig,
    graph: &mut StackGraph,
    suffix: &str,
    description: &str,
    vpc: NodeId,
    rules: &[SecurityRule],
) -> NodeId {
    let logical_name = format!("{}-{suffix}", config.name);
    let by_direction = |direction: Direction| {
        AttrValue::List(
            rules
                .iter()
                .filter(|r| r.direction == direction)
                .map(SecurityRule::to_attr)
                .collect(),
        )
    };
    let mut node = ResourceNode::new(ResourceKind::SecurityGroup, logical_name.clone())
        .attr("name", logical_name.as_str())
        .attr("description", description)
        .attr("vpc_id", AttrValue::reference(vpc, RefAttr::Id))
        .attr("ingress", by_direction(Direction::Ingress))
        .attr("egress", by_direction(Direction::Egress))
        .attr("tags", resource_tags(config, &logical_name))
        .depends_on(vpc);
    // A rule sourced from another group orders this group after it.
    for group in rules.iter().filter_map(SecurityRule::source_group) {
        node = node.depends_on(group);
    }
    graph.add(node)
}

fn region_condition(region: &str) -> AttrValue {
    AttrValue::map([(
        "StringEquals",
        AttrValue::map([("aws:RequestedRegion", AttrValue::from(region))]),
    )])
}

/// Trust for the workload's execution environment, pinned to the configured
/// region so the role cannot be assumed cross-region.
pub(crate) fn task_trust_policy(region: &str) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("TrustTaskEnvironment", ["sts:AssumeRole"])
            .principal(PolicyPrincipal::Service("ecs-tasks.amazonaws.com".into()))
            .when(region_condition(region)),
    ])
}

/// Trust for the registry-only topology's combined role: instances and the
/// account's own identity, so both hosts and operators can assume it.
pub(crate) fn registry_trust_policy(account: &AccountId, region: &str) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("TrustInstances", ["sts:AssumeRole"])
            .principal(PolicyPrincipal::Service("ec2.amazonaws.com".into()))
            .when(region_condition(region)),
        Statement::allow("TrustAccount", ["sts:AssumeRole"])
            .principal(PolicyPrincipal::Aws(format!("arn:aws:iam::{account}:root")))
            .when(region_condition(region)),
    ])
}

pub(crate) fn deploy_trust_policy(account: &AccountId, region: &str) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("TrustAccount", ["sts:AssumeRole"])
            .principal(PolicyPrincipal::Aws(format!("arn:aws:iam::{account}:root")))
            .when(region_condition(region)),
    ])
}

/// Runtime identity of the workload: pull layers from this stack's registry
/// entry, nothing else.
pub(crate) fn pull_policy(repository: NodeId) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("PullImages", PULL_ACTIONS)
            .on(AttrValue::reference(repository, RefAttr::Arn)),
    ])
}

/// The registry-only topology's combined pull/push policy: one role serves
/// both the build side and the run side when nothing else is synthesized.
pub(crate) fn registry_access_policy(repository: NodeId) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("GetAuthToken", ["ecr:GetAuthorizationToken"])
            .on(AttrValue::from("*")),
        Statement::allow("PushAndPullImages", PULL_ACTIONS.into_iter().chain(PUSH_ACTIONS))
            .on(AttrValue::reference(repository, RefAttr::Arn)),
    ])
}

/// Task execution: fetch an auth token (the action has no resource-level
/// permissions, hence the wildcard) and write to exactly this stack's log
/// group path.
pub(crate) fn execution_policy(log_arn: &str) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("GetAuthToken", ["ecr:GetAuthorizationToken"])
            .on(AttrValue::from("*")),
        Statement::allow("WriteLogs", ["logs:CreateLogStream", "logs:PutLogEvents"])
            .on(AttrValue::from(log_arn)),
    ])
}

/// CI/CD: push and pull images, manage the cluster and service, hand the
/// two runtime roles to the task environment, and manage the log group.
pub(crate) fn deploy_policy(
    repository: NodeId,
    access_arn: &str,
    execution_arn: &str,
    log_arn: &str,
) -> PolicyDocument {
    PolicyDocument::new(vec![
        Statement::allow("GetAuthToken", ["ecr:GetAuthorizationToken"])
            .on(AttrValue::from("*")),
        Statement::allow("PushAndPullImages", PULL_ACTIONS.into_iter().chain(PUSH_ACTIONS))
            .on(AttrValue::reference(repository, RefAttr::Arn)),
        Statement::allow(
            "ManageCompute",
            [
                "ecs:DescribeClusters",
                "ecs:DescribeServices",
                "ecs:DescribeTaskDefinition",
                "ecs:DescribeTasks",
                "ecs:ListTasks",
                "ecs:RegisterTaskDefinition",
                "ecs:UpdateService",
            ],
        )
        .on(AttrValue::from("*")),
        Statement::allow("HandOffRoles", ["iam:PassRole"])
            .on(AttrValue::from(access_arn))
            .on(AttrValue::from(execution_arn)),
        Statement::allow(
            "ManageLogs",
            [
                "logs:CreateLogGroup",
                "logs:DescribeLogGroups",
                "logs:PutRetentionPolicy",
            ],
        )
        .on(AttrValue::from(log_arn)),
    ])
}

/// The registry-only topology's single role.
pub(crate) fn build_registry_role(
    config: &StackConfig,
    account: &AccountId,
    repository: NodeId,
    graph: &mut StackGraph,
) -> RoleParts {
    add_role(
        config,
        account,
        graph,
        "ecr-role",
        "ecr-policy",
        &registry_trust_policy(account, &config.region),
        &registry_access_policy(repository),
    )
}

pub(crate) fn build_roles(
    config: &StackConfig,
    account: &AccountId,
    repository: NodeId,
    graph: &mut StackGraph,
) -> ComputeRoles {
    let log_arn = log_group_arn(config, account);
    let task_trust = task_trust_policy(&config.region);

    let access = add_role(
        config,
        account,
        graph,
        "ecr-role",
        "ecr-policy",
        &task_trust,
        &pull_policy(repository),
    );
    let execution = add_role(
        config,
        account,
        graph,
        "execution-role",
        "execution-policy",
        &task_trust,
        &execution_policy(&log_arn),
    );
    let deploy = add_role(
        config,
        account,
        graph,
        "deploy-role",
        "deploy-policy",
        &deploy_trust_policy(account, &config.region),
        &deploy_policy(repository, &access.arn, &execution.arn, &log_arn),
    );

    debug!(
        event = "Synthesis",
        phase = "Roles",
        access = access.name,
        execution = execution.name,
        deploy = deploy.name
    );

    ComputeRoles {
        access,
        execution,
        deploy,
    }
}

fn add_role(
    config: &StackConfig,
    account: &AccountId,
    graph: &mut StackGraph,
    role_suffix: &str,
    policy_suffix: &str,
    trust: &PolicyDocument,
    document: &PolicyDocument,
) -> RoleParts {
    let name = format!("{}-{role_suffix}", config.name);
    let node = graph.add(
        ResourceNode::new(ResourceKind::Role, name.clone())
            .attr("name", name.as_str())
            .attr("assume_role_policy", trust.to_attr())
            .attr("tags", resource_tags(config, &name)),
    );

    let policy_name = format!("{}-{policy_suffix}", config.name);
    let document_attr = document.to_attr();
    let mut policy = ResourceNode::new(ResourceKind::Policy, policy_name.clone())
        .attr("name", policy_name.as_str())
        .attr("role", AttrValue::reference(node, RefAttr::Id))
        .depends_on(node);
    // The policy must follow every resource its statements reference.
    for referenced in document_attr.referenced_nodes() {
        policy = policy.depends_on(referenced);
    }
    graph.add(policy.attr("document", document_attr));

    RoleParts {
        node,
        arn: role_arn(account, &name),
        name,
    }
}
