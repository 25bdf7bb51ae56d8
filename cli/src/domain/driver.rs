//! Driver variant selection.
//!
//! Which network manager, VM, and container runtime a workstation uses is a
//! pure function of three config values; nothing here touches a driver.

use crate::domain::config::{PROVIDER_INCUS, VM_DRIVER_COLIMA};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkVariant {
    /// Services reachable directly on the host's container bridge.
    Base,
    /// Services live inside a colima guest and need forwarding plus a host route.
    Colima,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmVariant {
    Colima,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeVariant {
    Docker,
    /// Incus inside a colima guest; brings its own VM handle.
    Incus,
}

/// The variants a workstation should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverPlan {
    pub network: NetworkVariant,
    pub vm: Option<VmVariant>,
    pub runtime: Option<RuntimeVariant>,
}

/// Select driver variants from `vm.driver`, `provider`, and `docker.enabled`.
#[must_use]
pub fn select_drivers(vm_driver: &str, provider: &str, docker_enabled: bool) -> DriverPlan {
    let colima = vm_driver == VM_DRIVER_COLIMA;
    let runtime = if provider == PROVIDER_INCUS {
        Some(RuntimeVariant::Incus)
    } else if docker_enabled {
        Some(RuntimeVariant::Docker)
    } else {
        None
    };
    DriverPlan {
        network: if colima {
            NetworkVariant::Colima
        } else {
            NetworkVariant::Base
        },
        vm: colima.then_some(VmVariant::Colima),
        runtime,
    }
}
