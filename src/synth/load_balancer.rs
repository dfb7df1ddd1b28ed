//! Load-balancing tier: balancer, target group, listener, and the edge
//! health rule.

use tracing::debug;

use crate::config::StackConfig;
use crate::graph::{NodeId, ResourceNode, StackGraph};
use crate::synth::network::NetworkParts;
use crate::synth::resource_tags;
use crate::types::{AttrValue, RefAttr, ResourceKind};

/// The fixed-response rule must be evaluated before the default forward
/// action, so its priority is the numerically lowest.
const HEALTH_RULE_PRIORITY: i64 = 1;

pub(crate) struct LoadBalancerParts {
    pub(crate) load_balancer: NodeId,
    pub(crate) target_group: NodeId,
    pub(crate) listener: NodeId,
}

pub(crate) fn build(
    config: &StackConfig,
    net: &NetworkParts,
    lb_sg: NodeId,
    graph: &mut StackGraph,
) -> LoadBalancerParts {
    let name = &config.name;

    let mut balancer = ResourceNode::new(ResourceKind::LoadBalancer, format!("{name}-alb"))
        .attr("name", format!("{name}-alb"))
        .attr("internal", false)
        .attr("load_balancer_type", "application")
        .attr(
            "subnets",
            AttrValue::List(
                net.subnets
                    .iter()
                    .map(|s| AttrValue::reference(*s, RefAttr::Id))
                    .collect(),
            ),
        )
        .attr(
            "security_groups",
            AttrValue::List(vec![AttrValue::reference(lb_sg, RefAttr::Id)]),
        )
        .attr("tags", resource_tags(config, &format!("{name}-alb")))
        .depends_on(lb_sg);
    for subnet in &net.subnets {
        balancer = balancer.depends_on(*subnet);
    }
    let load_balancer = graph.add(balancer);

    // IP targets: awsvpc workloads get their own address instead of sharing
    // the host's.
    let target_group = graph.add(
        ResourceNode::new(ResourceKind::TargetGroup, format!("{name}-tg"))
            .attr("name", format!("{name}-tg"))
            .attr("port", config.container_port)
            .attr("protocol", "HTTP")
            .attr("target_type", "ip")
            .attr("vpc_id", AttrValue::reference(net.vpc, RefAttr::Id))
            .attr(
                "health_check",
                AttrValue::map([
                    ("path", AttrValue::Str(config.health_check_path.clone())),
                    ("matcher", AttrValue::from("200")),
                    ("interval", AttrValue::Int(30)),
                    ("timeout", AttrValue::Int(5)),
                    ("healthy_threshold", AttrValue::Int(2)),
                    ("unhealthy_threshold", AttrValue::Int(3)),
                ]),
            )
            .depends_on(net.vpc),
    );

    let listener = graph.add(
        ResourceNode::new(ResourceKind::Listener, format!("{name}-listener"))
            .attr(
                "load_balancer_arn",
                AttrValue::reference(load_balancer, RefAttr::Arn),
            )
            .attr("port", 80u16)
            .attr("protocol", "HTTP")
            .attr(
                "default_action",
                AttrValue::map([
                    ("type", AttrValue::from("forward")),
                    (
                        "target_group_arn",
                        AttrValue::reference(target_group, RefAttr::Arn),
                    ),
                ]),
            )
            .depends_on(load_balancer)
            .depends_on(target_group),
    );

    // Liveness probing at the edge answers without consuming workload
    // capacity or depending on the workload being healthy.
    graph.add(
        ResourceNode::new(ResourceKind::ListenerRule, format!("{name}-health-rule"))
            .attr("listener_arn", AttrValue::reference(listener, RefAttr::Arn))
            .attr("priority", HEALTH_RULE_PRIORITY)
            .attr(
                "condition",
                AttrValue::map([(
                    "path_pattern",
                    AttrValue::List(vec![AttrValue::Str(config.health_check_path.clone())]),
                )]),
            )
            .attr(
                "action",
                AttrValue::map([
                    ("type", AttrValue::from("fixed-response")),
                    ("status_code", AttrValue::from("200")),
                    ("content_type", AttrValue::from("text/plain")),
                    ("message_body", AttrValue::from("OK")),
                ]),
            )
            .depends_on(listener),
    );

    debug!(
        event = "Synthesis",
        phase = "LoadBalancer",
        name = format!("{name}-alb"),
        health_path = config.health_check_path
    );

    LoadBalancerParts {
        load_balancer,
        target_group,
        listener,
    }
}
