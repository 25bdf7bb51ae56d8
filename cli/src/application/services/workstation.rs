//! Application service: workstation lifecycle.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! Every driver is reached through a port; the order of calls here is the
//! contract the drivers rely on.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ports::{
    ApplyHook, ComponentFactory, ConfigHandler, ContainerRuntime, NetworkManager, ProcessEnv,
    Service, VirtualMachine,
};
use crate::application::runtime::Runtime;
use crate::application::workloads::build_service_set;
use crate::domain::blueprint::WORKSTATION_COMPONENT;
use crate::domain::config::{PROVIDER_INCUS, VM_DRIVER_COLIMA, keys};
use crate::domain::environment::NO_CACHE_VAR;
use crate::domain::{Blueprint, PrivilegeError, WorkstationError, select_drivers};

/// The local machine half of a project: VM, container runtime, services,
/// and the network that ties them to the host.
pub struct Workstation {
    runtime: Runtime,
    factory: Arc<dyn ComponentFactory>,
    network: Option<Arc<dyn NetworkManager>>,
    services: Option<Vec<Arc<dyn Service>>>,
    vm: Option<Arc<dyn VirtualMachine>>,
    container_runtime: Option<Box<dyn ContainerRuntime>>,
    defer_host_guest_setup: bool,
}

impl Workstation {
    #[must_use]
    pub fn new(runtime: Runtime, factory: Arc<dyn ComponentFactory>) -> Self {
        Self {
            runtime,
            factory,
            network: None,
            services: None,
            vm: None,
            container_runtime: None,
            defer_host_guest_setup: false,
        }
    }

    /// Use `services` instead of building the set from config.
    #[must_use]
    pub fn with_services(mut self, services: Vec<Arc<dyn Service>>) -> Self {
        self.services = Some(services);
        self
    }

    #[must_use]
    pub fn network(&self) -> Option<&Arc<dyn NetworkManager>> {
        self.network.as_ref()
    }

    #[must_use]
    pub fn services(&self) -> &[Arc<dyn Service>] {
        self.services.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn virtual_machine(&self) -> Option<&Arc<dyn VirtualMachine>> {
        self.vm.as_ref()
    }

    #[must_use]
    pub fn container_runtime(&self) -> Option<&dyn ContainerRuntime> {
        self.container_runtime.as_deref()
    }

    #[must_use]
    pub fn defers_host_guest_setup(&self) -> bool {
        self.defer_host_guest_setup
    }

    fn vm_driver(&self) -> String {
        self.runtime.config.string_or(keys::VM_DRIVER, "")
    }

    fn provider(&self) -> String {
        self.runtime.config.string_or(keys::PROVIDER, "")
    }

    /// Select drivers, build the service set, and assign addresses.
    ///
    /// Must run after config is loaded and before anything reads a service
    /// address.
    ///
    /// # Errors
    ///
    /// Address assignment errors are returned unchanged.
    pub fn prepare(&mut self) -> Result<()> {
        let docker_enabled = self.runtime.config.bool_or(keys::DOCKER_ENABLED, false);
        let plan = select_drivers(&self.vm_driver(), &self.provider(), docker_enabled);
        tracing::debug!(?plan, "workstation drivers selected");

        let network = self.factory.network_manager(plan.network, &self.runtime);
        let services = self
            .services
            .get_or_insert_with(|| build_service_set(&self.runtime));
        if docker_enabled {
            network.assign_ips(services)?;
        }
        self.network = Some(network);

        self.vm = plan
            .vm
            .map(|variant| self.factory.virtual_machine(variant, &self.runtime));
        self.container_runtime = plan.runtime.map(|variant| {
            self.factory
                .container_runtime(variant, &self.runtime, self.services())
        });
        if let Some(embedded) = self
            .container_runtime
            .as_ref()
            .and_then(|rt| rt.embedded_vm())
        {
            tracing::debug!("container runtime supplies its own virtual machine");
            self.vm = Some(embedded);
        }
        Ok(())
    }

    /// Bring the workstation up.
    ///
    /// Sets the cache-disable flag in `env`, starts the VM, renders service
    /// config, starts the container runtime, then configures networking
    /// unless that is deferred to the apply hook.
    ///
    /// # Errors
    ///
    /// Fails on the first step that fails, naming the component.
    pub fn up(&self, env: &dyn ProcessEnv) -> Result<()> {
        env.set(NO_CACHE_VAR, "true");

        if self.vm_driver() == VM_DRIVER_COLIMA {
            let vm = self.vm.as_ref().ok_or(WorkstationError::NoVirtualMachine)?;
            vm.write_config()
                .context("failed to write virtual machine config")?;
            vm.up().context("failed to start virtual machine")?;
            tracing::info!(address = ?vm.address(), "virtual machine running");

            if self.provider() == PROVIDER_INCUS {
                if vm.address().is_none_or(|a| a.is_empty()) {
                    return Err(WorkstationError::VmAddressMissing.into());
                }
                if let Some(network) = &self.network {
                    network
                        .configure_guest()
                        .context("failed to configure guest network")?;
                }
            }
        }

        for service in self.services() {
            service
                .write_config()
                .with_context(|| format!("failed to write config for service {}", service.name()))?;
        }

        if let Some(rt) = &self.container_runtime {
            rt.write_config()
                .context("failed to write container runtime config")?;
            rt.up().context("failed to start container runtime")?;
        }

        match &self.network {
            Some(network) if !self.defer_host_guest_setup => {
                configure_network(network.as_ref(), self.runtime.config.as_ref())?;
            }
            Some(_) => tracing::info!("network setup deferred until workstation infrastructure is applied"),
            None => {}
        }
        Ok(())
    }

    /// Decide whether network setup waits for the `workstation` component.
    pub fn prepare_for_up(&mut self, blueprint: Option<&Blueprint>) {
        let apply_enabled = self.runtime.config.bool_or(keys::TERRAFORM_ENABLED, true);
        self.defer_host_guest_setup = blueprint
            .is_some_and(|bp| apply_enabled && bp.has_component(WORKSTATION_COMPONENT));
    }

    /// Hook for the provisioner, present only when network setup is deferred.
    ///
    /// The hook ignores every component but `workstation`, and for that one
    /// runs the same network sequence `up` would have run.
    #[must_use]
    pub fn make_apply_hook(&self) -> Option<ApplyHook> {
        if !self.defer_host_guest_setup {
            return None;
        }
        let network = Arc::clone(self.network.as_ref()?);
        let config = Arc::clone(&self.runtime.config);
        Some(Box::new(move |component: &str| {
            if component != WORKSTATION_COMPONENT {
                return Ok(());
            }
            configure_network(network.as_ref(), config.as_ref())
        }))
    }

    /// Pre-flight check that network setup will be able to escalate.
    ///
    /// # Errors
    ///
    /// Returns [`PrivilegeError::Required`] when neither an interactive nor
    /// a passwordless sudo check succeeds.
    pub fn ensure_network_privilege(&self) -> Result<()> {
        let Some(network) = &self.network else {
            return Ok(());
        };
        if !network.needs_privilege() {
            return Ok(());
        }
        let shell = &self.runtime.shell;
        if shell
            .exec_sudo("Network configuration requires administrator privileges", "true", &[])
            .is_ok()
        {
            return Ok(());
        }
        tracing::debug!("interactive sudo failed, probing passwordless sudo");
        if shell.exec_silent("sudo", &["-n", "true"]).is_ok() {
            return Ok(());
        }
        Err(PrivilegeError::Required.into())
    }

    /// Stop the container runtime, then the VM.
    ///
    /// # Errors
    ///
    /// Aborts on the first failure, naming the component. No rollback.
    pub fn down(&self) -> Result<()> {
        if self.provider() == PROVIDER_INCUS && self.vm_driver() == VM_DRIVER_COLIMA && self.vm.is_some() {
            if let Some(network) = &self.network {
                network
                    .configure_guest()
                    .context("failed to configure guest network")?;
            }
        }
        if let Some(rt) = &self.container_runtime {
            rt.down().context("failed to stop container runtime")?;
        }
        if let Some(vm) = &self.vm {
            vm.down().context("failed to stop virtual machine")?;
        }
        Ok(())
    }
}

/// Guest forwarding and host route (colima only), then DNS when enabled.
fn configure_network(network: &dyn NetworkManager, config: &dyn ConfigHandler) -> Result<()> {
    if config.string_or(keys::VM_DRIVER, "") == VM_DRIVER_COLIMA {
        network
            .configure_guest()
            .context("failed to configure guest network")?;
        network
            .configure_host_route()
            .context("failed to configure host route")?;
    }
    if config.bool_or(keys::DNS_ENABLED, false) {
        network.configure_dns().context("failed to configure DNS")?;
    }
    Ok(())
}
