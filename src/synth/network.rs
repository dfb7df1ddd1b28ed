//! Network topology tier: VPC, internet gateway, public subnets, routing.

use std::net::Ipv4Addr;

use tracing::debug;

use crate::config::StackConfig;
use crate::error::SynthError;
use crate::graph::{NodeId, ResourceNode, StackGraph};
use crate::synth::resource_tags;
use crate::types::{AttrValue, Cidr, RefAttr, ResourceKind};

pub(crate) struct NetworkParts {
    pub(crate) vpc: NodeId,
    pub(crate) subnets: Vec<NodeId>,
}

/// How many zones the topology spans. Two, for resilience: the load
/// balancer and the service both assume a second subnet exists.
const ZONE_COUNT: usize = 2;

pub(crate) fn build(
    config: &StackConfig,
    zones: &[String],
    graph: &mut StackGraph,
) -> Result<NetworkParts, SynthError> {
    if zones.len() < ZONE_COUNT {
        return Err(SynthError::InsufficientAvailabilityZones {
            region: config.region.clone(),
            found: zones.len(),
        });
    }
    let zones = &zones[..ZONE_COUNT];
    let name = &config.name;

    let vpc_block = Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 16);
    let vpc = graph.add(
        ResourceNode::new(ResourceKind::Network, format!("{name}-vpc"))
            .attr("cidr_block", vpc_block.to_string())
            .attr("enable_dns_support", true)
            .attr("enable_dns_hostnames", true)
            .attr("tags", resource_tags(config, &format!("{name}-vpc"))),
    );

    let internet_gateway = graph.add(
        ResourceNode::new(ResourceKind::InternetGateway, format!("{name}-igw"))
            .attr("vpc_id", AttrValue::reference(vpc, RefAttr::Id))
            .attr("tags", resource_tags(config, &format!("{name}-igw")))
            .depends_on(vpc),
    );

    let mut subnets = Vec::with_capacity(ZONE_COUNT);
    let mut subnet_blocks = Vec::with_capacity(ZONE_COUNT);
    for (index, zone) in zones.iter().enumerate() {
        // One /24 per zone, carved sequentially out of the /16.
        let block = Cidr::new(Ipv4Addr::new(10, 0, index as u8, 0), 24);
        debug_assert!(vpc_block.contains(&block));
        debug_assert!(subnet_blocks.iter().all(|prior: &Cidr| !prior.overlaps(&block)));

        let subnet = graph.add(
            ResourceNode::new(ResourceKind::Subnet, format!("{name}-subnet-{index}"))
                .attr("vpc_id", AttrValue::reference(vpc, RefAttr::Id))
                .attr("cidr_block", block.to_string())
                .attr("availability_zone", zone.as_str())
                .attr("map_public_ip_on_launch", true)
                .attr("tags", resource_tags(config, &format!("{name}-subnet-{index}")))
                .depends_on(vpc),
        );
        subnets.push(subnet);
        subnet_blocks.push(block);
    }

    let route_table = graph.add(
        ResourceNode::new(ResourceKind::RouteTable, format!("{name}-rt"))
            .attr("vpc_id", AttrValue::reference(vpc, RefAttr::Id))
            .attr("tags", resource_tags(config, &format!("{name}-rt")))
            .depends_on(vpc),
    );

    graph.add(
        ResourceNode::new(ResourceKind::Route, format!("{name}-route-default"))
            .attr("route_table_id", AttrValue::reference(route_table, RefAttr::Id))
            .attr("destination_cidr_block", Cidr::ANY.to_string())
            .attr("gateway_id", AttrValue::reference(internet_gateway, RefAttr::Id))
            .depends_on(route_table)
            .depends_on(internet_gateway),
    );

    for (index, subnet) in subnets.iter().enumerate() {
        graph.add(
            ResourceNode::new(
                ResourceKind::RouteTableAssociation,
                format!("{name}-rta-{index}"),
            )
            .attr("subnet_id", AttrValue::reference(*subnet, RefAttr::Id))
            .attr("route_table_id", AttrValue::reference(route_table, RefAttr::Id))
            .depends_on(*subnet)
            .depends_on(route_table),
        );
    }

    debug!(
        event = "Synthesis",
        phase = "Network",
        vpc = vpc_block.to_string(),
        zones = zones.join(","),
        subnets = subnets.len()
    );

    Ok(NetworkParts { vpc, subnets })
}
