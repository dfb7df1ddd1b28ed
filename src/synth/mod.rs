//! The synthesis pipeline.
//!
//! One single-threaded pass per invocation: provider facts are looked up
//! first, then each tier's builder runs to completion before anything that
//! depends on it, and the output exporter reads the finished graph last.
//! Identical configuration produces a structurally identical stack; nothing
//! is shared between passes.

use tracing::{debug, info};

use crate::config::{StackConfig, Topology};
use crate::error::SynthError;
use crate::graph::StackGraph;
use crate::provider::ProviderFacts;
use crate::types::{AttrValue, Outputs};

mod load_balancer;
mod network;
mod outputs;
mod security;
mod workload;

#[cfg(test)]
mod tests;

/// The result of one synthesis pass: the dependency-ordered resource graph
/// and the named outputs a consumer reads back after apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    pub config: StackConfig,
    pub graph: StackGraph,
    pub outputs: Outputs,
}

/// Build the full resource graph and output table for `config`.
///
/// Fails without producing any node when required facts are missing or the
/// region cannot support the topology; there is no partial-success state.
pub fn synthesize(
    config: &StackConfig,
    facts: &dyn ProviderFacts,
) -> Result<Stack, SynthError> {
    info!(
        event = "Synthesis",
        phase = "Start",
        stack = config.name,
        region = config.region,
        topology = %config.topology
    );

    let identity = facts.caller_identity()?;
    let account = &identity.account_id;
    debug!(event = "Synthesis", phase = "Facts", account = %account);

    let mut graph = StackGraph::new();
    let registry = workload::build_registry(config, &mut graph);

    let outputs = match config.topology {
        Topology::Registry => {
            let access =
                security::build_registry_role(config, account, registry.repository, &mut graph);
            outputs::export_registry(config, account, &registry, &access)?
        }
        Topology::Compute | Topology::Full => {
            let zones = facts.availability_zones(&config.region)?;
            let net = network::build(config, &zones, &mut graph)?;
            let groups = security::build_groups(config, &net, &mut graph);
            let roles = security::build_roles(config, account, registry.repository, &mut graph);
            let lb = groups
                .lb_sg
                .map(|sg| load_balancer::build(config, &net, sg, &mut graph));
            let workload = workload::build_compute(
                config,
                account,
                &net,
                &groups,
                &roles,
                lb.as_ref(),
                &mut graph,
            );
            outputs::export_stack(
                config,
                account,
                &registry,
                &net,
                &groups,
                &roles,
                &workload,
                lb.as_ref(),
            )?
        }
    };

    info!(
        event = "Synthesis",
        phase = "Done",
        nodes = graph.len(),
        outputs = outputs.len()
    );

    Ok(Stack {
        config: config.clone(),
        graph,
        outputs,
    })
}

/// The tag set every resource carries.
pub(crate) fn resource_tags(config: &StackConfig, name: &str) -> AttrValue {
    AttrValue::map([
        ("Name", AttrValue::from(name)),
        ("Environment", AttrValue::from("development")),
        ("Project", AttrValue::Str(config.name.clone())),
        ("ManagedBy", AttrValue::from("stackforge")),
    ])
}
