//! Service-set planning: which auxiliary workloads a workstation runs.
//!
//! The order produced here is the order services are addressed, configured,
//! and rendered, so it is part of the contract.

use crate::domain::config::PROVIDER_INCUS;

pub const DNS_SERVICE: &str = "dns";
pub const GIT_SERVICE: &str = "git";
pub const LOCALSTACK_SERVICE: &str = "aws";

/// Cluster drivers that run their nodes as local containers.
pub const CONTAINER_CLUSTER_DRIVERS: &[&str] = &["talos", "omni"];

/// Role of a cluster node workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

impl NodeRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ControlPlane => "controlplane",
            Self::Worker => "worker",
        }
    }
}

/// What kind of workload a planned service is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceKind {
    Dns,
    GitLivereload,
    Localstack,
    Registry,
    ClusterNode { role: NodeRole },
}

/// A planned service: unique name plus kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub kind: ServiceKind,
}

impl ServiceSpec {
    fn new(name: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Config flags the service plan depends on.
#[derive(Debug, Clone, Default)]
pub struct ServicePlanInput {
    pub docker_enabled: bool,
    pub dns_enabled: bool,
    pub git_livereload_enabled: bool,
    pub localstack_enabled: bool,
    /// Registry keys in configured order.
    pub registries: Vec<String>,
    pub provider: String,
    pub cluster_driver: String,
    pub controlplanes: u32,
    pub workers: u32,
}

/// Plan the service set.
///
/// Empty when docker is disabled. Otherwise: `dns`, `git`, `aws`, one entry
/// per registry key, then `controlplane-1..N` and `worker-1..M` when the
/// cluster runs as containers (talos/omni, provider other than incus).
#[must_use]
pub fn plan_services(input: &ServicePlanInput) -> Vec<ServiceSpec> {
    let mut plan = Vec::new();
    if !input.docker_enabled {
        return plan;
    }

    if input.dns_enabled {
        plan.push(ServiceSpec::new(DNS_SERVICE, ServiceKind::Dns));
    }
    if input.git_livereload_enabled {
        plan.push(ServiceSpec::new(GIT_SERVICE, ServiceKind::GitLivereload));
    }
    if input.localstack_enabled {
        plan.push(ServiceSpec::new(LOCALSTACK_SERVICE, ServiceKind::Localstack));
    }
    for key in &input.registries {
        plan.push(ServiceSpec::new(key.clone(), ServiceKind::Registry));
    }

    if input.provider != PROVIDER_INCUS
        && CONTAINER_CLUSTER_DRIVERS.contains(&input.cluster_driver.as_str())
    {
        for (role, count) in [
            (NodeRole::ControlPlane, input.controlplanes),
            (NodeRole::Worker, input.workers),
        ] {
            for i in 1..=count {
                plan.push(ServiceSpec::new(
                    format!("{}-{i}", role.as_str()),
                    ServiceKind::ClusterNode { role },
                ));
            }
        }
    }
    plan
}
