//! The output exporter: the flat named table consumers read after a pass.
//!
//! Every key a topology promises is re-checked with [`Outputs::require`]
//! before the table leaves this module; a builder omission surfaces as
//! `MissingOutput` instead of a null a CI pipeline trips over later.

use tracing::debug;

use crate::config::{StackConfig, Topology};
use crate::error::SynthError;
use crate::provider::AccountId;
use crate::synth::load_balancer::LoadBalancerParts;
use crate::synth::network::NetworkParts;
use crate::synth::security::{ComputeRoles, Groups, RoleParts};
use crate::synth::workload::{RegistryParts, WorkloadParts, log_group_name, registry_url};
use crate::types::{AttrValue, Outputs, RefAttr};

pub(crate) const REGISTRY_KEYS: &[&str] = &[
    "ecr-repository-url",
    "ecr-repository-arn",
    "ecr-repository-name",
    "ecr-access-role-arn",
    "ecr-access-role-name",
    "docker-login-command",
    "assume-role-command",
];

pub(crate) const COMPUTE_KEYS: &[&str] = &[
    "task-execution-role-arn",
    "deploy-role-arn",
    "vpc-id",
    "subnet-ids",
    "service-security-group-id",
    "cluster-name",
    "cluster-arn",
    "service-name",
    "task-definition-arn",
    "log-group-name",
];

pub(crate) const LOAD_BALANCER_KEYS: &[&str] = &[
    "alb-security-group-id",
    "alb-dns-name",
    "health-check-url",
    "application-url",
];

/// Every key a synthesis pass with this topology must export.
pub(crate) fn required_keys(topology: Topology) -> Vec<&'static str> {
    let mut keys = REGISTRY_KEYS.to_vec();
    if topology.has_compute() {
        keys.extend_from_slice(COMPUTE_KEYS);
    }
    if topology.has_load_balancer() {
        keys.extend_from_slice(LOAD_BALANCER_KEYS);
    }
    keys
}

pub(crate) fn export_registry(
    config: &StackConfig,
    account: &AccountId,
    registry: &RegistryParts,
    access: &RoleParts,
) -> Result<Outputs, SynthError> {
    let mut outputs = Outputs::new();
    registry_outputs(&mut outputs, config, account, registry, access)?;
    finish(outputs, config)
}

pub(crate) fn export_stack(
    config: &StackConfig,
    account: &AccountId,
    registry: &RegistryParts,
    net: &NetworkParts,
    groups: &Groups,
    roles: &ComputeRoles,
    workload: &WorkloadParts,
    lb: Option<&LoadBalancerParts>,
) -> Result<Outputs, SynthError> {
    let mut outputs = Outputs::new();
    registry_outputs(&mut outputs, config, account, registry, &roles.access)?;

    outputs.export(
        "task-execution-role-arn",
        AttrValue::Str(roles.execution.arn.clone()),
        "IAM Role ARN the task environment uses to pull and log",
    )?;
    outputs.export(
        "deploy-role-arn",
        AttrValue::Str(roles.deploy.arn.clone()),
        "IAM Role ARN for CI/CD deployments",
    )?;
    outputs.export(
        "vpc-id",
        AttrValue::reference(net.vpc, RefAttr::Id),
        "VPC identifier",
    )?;
    outputs.export(
        "subnet-ids",
        AttrValue::List(
            net.subnets
                .iter()
                .map(|s| AttrValue::reference(*s, RefAttr::Id))
                .collect(),
        ),
        "Public subnet identifiers",
    )?;
    outputs.export(
        "service-security-group-id",
        AttrValue::reference(groups.workload_sg, RefAttr::Id),
        "Security group attached to the workload",
    )?;
    outputs.export(
        "cluster-name",
        AttrValue::Str(format!("{}-cluster", config.name)),
        "Compute cluster name",
    )?;
    outputs.export(
        "cluster-arn",
        AttrValue::reference(workload.cluster, RefAttr::Arn),
        "Compute cluster ARN",
    )?;
    outputs.export(
        "service-name",
        AttrValue::Str(format!("{}-service", config.name)),
        "Running service name",
    )?;
    outputs.export(
        "task-definition-arn",
        AttrValue::reference(workload.task_definition, RefAttr::Arn),
        "Workload definition ARN",
    )?;
    outputs.export(
        "log-group-name",
        AttrValue::Str(log_group_name(config)),
        "Log group receiving workload output",
    )?;

    if let (Some(lb), Some(lb_sg)) = (lb, groups.lb_sg) {
        outputs.export(
            "alb-security-group-id",
            AttrValue::reference(lb_sg, RefAttr::Id),
            "Security group attached to the load balancer",
        )?;
        outputs.export(
            "alb-dns-name",
            AttrValue::reference(lb.load_balancer, RefAttr::DnsName),
            "Public DNS name of the load balancer",
        )?;
        outputs.export(
            "health-check-url",
            AttrValue::concat([
                AttrValue::from("http://"),
                AttrValue::reference(lb.load_balancer, RefAttr::DnsName),
                AttrValue::Str(config.health_check_path.clone()),
            ]),
            "Health endpoint answered at the edge",
        )?;
        outputs.export(
            "application-url",
            AttrValue::concat([
                AttrValue::from("http://"),
                AttrValue::reference(lb.load_balancer, RefAttr::DnsName),
            ]),
            "Base URL of the application",
        )?;
    }

    finish(outputs, config)
}

fn registry_outputs(
    outputs: &mut Outputs,
    config: &StackConfig,
    account: &AccountId,
    registry: &RegistryParts,
    access: &RoleParts,
) -> Result<(), SynthError> {
    let url = registry_url(config, account);
    outputs.export(
        "ecr-repository-url",
        AttrValue::Str(url.clone()),
        "ECR Repository URL for pushing/pulling images",
    )?;
    outputs.export(
        "ecr-repository-arn",
        AttrValue::reference(registry.repository, RefAttr::Arn),
        "ECR Repository ARN",
    )?;
    outputs.export(
        "ecr-repository-name",
        AttrValue::Str(config.name.clone()),
        "ECR Repository Name",
    )?;
    outputs.export(
        "ecr-access-role-arn",
        AttrValue::Str(access.arn.clone()),
        "IAM Role ARN for ECR access",
    )?;
    outputs.export(
        "ecr-access-role-name",
        AttrValue::Str(access.name.clone()),
        "IAM Role Name for ECR access",
    )?;
    outputs.export(
        "docker-login-command",
        AttrValue::Str(format!(
            "aws ecr get-login-password --region {} | docker login --username AWS --password-stdin {url}",
            config.region
        )),
        "Command to authenticate Docker with ECR",
    )?;
    outputs.export(
        "assume-role-command",
        AttrValue::Str(format!(
            "aws sts assume-role --role-arn {} --role-session-name ECRAccess",
            access.arn
        )),
        "Command to assume the ECR access role",
    )?;
    Ok(())
}

fn finish(outputs: Outputs, config: &StackConfig) -> Result<Outputs, SynthError> {
    for key in required_keys(config.topology) {
        outputs.require(key)?;
    }
    debug!(
        event = "Synthesis",
        phase = "Outputs",
        count = outputs.len()
    );
    Ok(outputs)
}
