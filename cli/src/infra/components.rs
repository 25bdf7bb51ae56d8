//! Production `ComponentFactory`: maps driver variants to host adapters.

use std::sync::Arc;

use crate::application::Runtime;
use crate::application::network::{BaseNetworkManager, ColimaNetworkManager};
use crate::application::ports::{
    ComponentFactory, Composer, ContainerRuntime, NetworkManager, Provisioner, Service,
    VirtualMachine,
};
use crate::domain::config::keys;
use crate::domain::{NetworkVariant, RuntimeVariant, VmVariant};
use crate::infra::colima::ColimaVm;
use crate::infra::composer::BlueprintComposer;
use crate::infra::docker::DockerRuntime;
use crate::infra::incus::IncusRuntime;
use crate::infra::terraform::TerraformProvisioner;

/// Guest runtime colima runs when `vm.runtime` is unset.
const DEFAULT_GUEST_RUNTIME: &str = "docker";

#[derive(Debug, Clone, Copy, Default)]
pub struct HostComponents;

impl ComponentFactory for HostComponents {
    fn network_manager(
        &self,
        variant: NetworkVariant,
        runtime: &Runtime,
    ) -> Arc<dyn NetworkManager> {
        match variant {
            NetworkVariant::Base => Arc::new(BaseNetworkManager::new(runtime.clone())),
            NetworkVariant::Colima => Arc::new(ColimaNetworkManager::new(runtime.clone())),
        }
    }

    fn virtual_machine(&self, variant: VmVariant, runtime: &Runtime) -> Arc<dyn VirtualMachine> {
        match variant {
            VmVariant::Colima => {
                let guest = runtime
                    .config
                    .string_or(keys::VM_RUNTIME, DEFAULT_GUEST_RUNTIME);
                Arc::new(ColimaVm::new(runtime.clone(), &guest))
            }
        }
    }

    fn container_runtime(
        &self,
        variant: RuntimeVariant,
        runtime: &Runtime,
        services: &[Arc<dyn Service>],
    ) -> Box<dyn ContainerRuntime> {
        match variant {
            RuntimeVariant::Docker => Box::new(DockerRuntime::new(runtime.clone(), services.to_vec())),
            RuntimeVariant::Incus => Box::new(IncusRuntime::new(runtime.clone())),
        }
    }

    fn composer(&self, runtime: &Runtime) -> Box<dyn Composer> {
        Box::new(BlueprintComposer::new(runtime.clone()))
    }

    fn provisioner(&self, runtime: &Runtime) -> Box<dyn Provisioner> {
        Box::new(TerraformProvisioner::new(runtime.clone()))
    }
}
