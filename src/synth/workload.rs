//! Registry and workload tier: container registry, log group, cluster,
//! task definition, and the running service.

use tracing::debug;

use crate::config::StackConfig;
use crate::graph::{NodeId, ResourceNode, StackGraph};
use crate::provider::AccountId;
use crate::synth::load_balancer::LoadBalancerParts;
use crate::synth::network::NetworkParts;
use crate::synth::resource_tags;
use crate::synth::security::{ComputeRoles, Groups};
use crate::types::{AttrValue, RefAttr, ResourceKind};

const LOG_RETENTION_DAYS: i64 = 30;
const TASK_CPU: &str = "256";
const TASK_MEMORY: &str = "512";
const DESIRED_COUNT: i64 = 1;

pub(crate) struct RegistryParts {
    pub(crate) repository: NodeId,
}

pub(crate) struct WorkloadParts {
    pub(crate) cluster: NodeId,
    pub(crate) task_definition: NodeId,
}

pub(crate) fn log_group_name(config: &StackConfig) -> String {
    format!("/ecs/{}", config.name)
}

/// The registry URL is deterministic from the account and region, so it is a
/// synthesis-time literal rather than a declare-time reference.
pub(crate) fn registry_url(config: &StackConfig, account: &AccountId) -> String {
    format!(
        "{account}.dkr.ecr.{}.amazonaws.com/{}",
        config.region, config.name
    )
}

pub(crate) fn build_registry(config: &StackConfig, graph: &mut StackGraph) -> RegistryParts {
    let logical_name = format!("{}-registry", config.name);
    let repository = graph.add(
        ResourceNode::new(ResourceKind::Registry, logical_name)
            .attr("name", config.name.as_str())
            .attr(
                "image_tag_mutability",
                config.image_tag_mutability.to_string(),
            )
            .attr("scan_on_push", config.scan_on_push)
            .attr("encryption_type", "AES256")
            .attr("force_delete", true)
            .attr("tags", resource_tags(config, &config.name)),
    );
    debug!(event = "Synthesis", phase = "Registry", name = config.name);
    RegistryParts { repository }
}

pub(crate) fn build_compute(
    config: &StackConfig,
    account: &AccountId,
    net: &NetworkParts,
    groups: &Groups,
    roles: &ComputeRoles,
    lb: Option<&LoadBalancerParts>,
    graph: &mut StackGraph,
) -> WorkloadParts {
    let name = &config.name;

    let log_group = graph.add(
        ResourceNode::new(ResourceKind::LogGroup, format!("{name}-log-group"))
            .attr("name", log_group_name(config))
            .attr("retention_in_days", LOG_RETENTION_DAYS)
            .attr("tags", resource_tags(config, &log_group_name(config))),
    );

    let cluster = graph.add(
        ResourceNode::new(ResourceKind::Cluster, format!("{name}-cluster"))
            .attr("name", format!("{name}-cluster"))
            .attr("container_insights", "enabled")
            .attr("tags", resource_tags(config, &format!("{name}-cluster"))),
    );

    let task_definition = graph.add(
        ResourceNode::new(ResourceKind::Workload, format!("{name}-task"))
            .attr("family", name.as_str())
            .attr("cpu", TASK_CPU)
            .attr("memory", TASK_MEMORY)
            .attr("network_mode", "awsvpc")
            .attr(
                "requires_compatibilities",
                AttrValue::List(vec![AttrValue::from("FARGATE")]),
            )
            .attr("execution_role_arn", roles.execution.arn.as_str())
            .attr("task_role_arn", roles.access.arn.as_str())
            .attr(
                "container_definitions",
                AttrValue::List(vec![container_definition(config, account)]),
            )
            .depends_on(log_group)
            .depends_on(roles.access.node)
            .depends_on(roles.execution.node),
    );

    let mut service = ResourceNode::new(ResourceKind::Service, format!("{name}-service"))
        .attr("name", format!("{name}-service"))
        .attr("cluster", AttrValue::reference(cluster, RefAttr::Arn))
        .attr(
            "task_definition",
            AttrValue::reference(task_definition, RefAttr::Arn),
        )
        .attr("desired_count", DESIRED_COUNT)
        .attr("launch_type", "FARGATE")
        .attr(
            "network_configuration",
            AttrValue::map([
                (
                    "subnets",
                    AttrValue::List(
                        net.subnets
                            .iter()
                            .map(|s| AttrValue::reference(*s, RefAttr::Id))
                            .collect(),
                    ),
                ),
                (
                    "security_groups",
                    AttrValue::List(vec![AttrValue::reference(
                        groups.workload_sg,
                        RefAttr::Id,
                    )]),
                ),
                ("assign_public_ip", AttrValue::from(true)),
            ]),
        )
        .depends_on(cluster)
        .depends_on(task_definition)
        .depends_on(groups.workload_sg);
    for subnet in &net.subnets {
        service = service.depends_on(*subnet);
    }
    if let Some(lb) = lb {
        // Traffic registration against a not-yet-provisioned balancer is
        // undefined at the provider; the service follows the listener.
        service = service
            .attr(
                "load_balancer",
                AttrValue::map([
                    (
                        "target_group_arn",
                        AttrValue::reference(lb.target_group, RefAttr::Arn),
                    ),
                    ("container_name", AttrValue::Str(config.name.clone())),
                    ("container_port", AttrValue::from(config.container_port)),
                ]),
            )
            .depends_on(lb.target_group)
            .depends_on(lb.listener);
    }
    graph.add(service);

    debug!(
        event = "Synthesis",
        phase = "Workload",
        cluster = format!("{name}-cluster"),
        behind_load_balancer = lb.is_some()
    );

    WorkloadParts {
        cluster,
        task_definition,
    }
}

fn container_definition(config: &StackConfig, account: &AccountId) -> AttrValue {
    AttrValue::map([
        ("name", AttrValue::Str(config.name.clone())),
        (
            "image",
            AttrValue::Str(format!(
                "{}:{}",
                registry_url(config, account),
                config.image_tag
            )),
        ),
        ("essential", AttrValue::from(true)),
        (
            "port_mappings",
            AttrValue::List(vec![AttrValue::map([
                ("container_port", AttrValue::from(config.container_port)),
                ("protocol", AttrValue::from("tcp")),
            ])]),
        ),
        (
            "environment",
            AttrValue::List(vec![AttrValue::map([
                ("name", AttrValue::from("PORT")),
                ("value", AttrValue::Str(config.container_port.to_string())),
            ])]),
        ),
        (
            "health_check",
            AttrValue::map([
                (
                    "command",
                    AttrValue::List(
                        config
                            .health_check_command
                            .iter()
                            .map(|part| AttrValue::Str(part.clone()))
                            .collect(),
                    ),
                ),
                ("interval", AttrValue::Int(30)),
                ("timeout", AttrValue::Int(5)),
                ("retries", AttrValue::Int(3)),
                ("start_period", AttrValue::Int(60)),
            ]),
        ),
        (
            "log_configuration",
            AttrValue::map([
                ("log_driver", AttrValue::from("awslogs")),
                (
                    "options",
                    AttrValue::map([
                        ("awslogs-group", AttrValue::Str(log_group_name(config))),
                        ("awslogs-region", AttrValue::Str(config.region.clone())),
                        ("awslogs-stream-prefix", AttrValue::from("ecs")),
                    ]),
                ),
            ]),
        ),
    ])
}
