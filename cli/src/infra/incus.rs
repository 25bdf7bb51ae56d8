//! Incus-in-colima `ContainerRuntime`.
//!
//! The runtime lives inside its own colima guest, so it owns that VM and
//! hands it to the workstation through `embedded_vm`.

use std::sync::Arc;

use anyhow::Result;

use crate::application::Runtime;
use crate::application::ports::{ContainerRuntime, VirtualMachine};
use crate::domain::RuntimeVariant;
use crate::domain::config::RUNTIME_INCUS;
use crate::infra::colima::ColimaVm;

pub struct IncusRuntime {
    runtime: Runtime,
    vm: Arc<dyn VirtualMachine>,
}

impl IncusRuntime {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        let vm: Arc<dyn VirtualMachine> = Arc::new(ColimaVm::new(runtime.clone(), RUNTIME_INCUS));
        Self { runtime, vm }
    }

    fn remote(&self) -> String {
        format!("colima-{}", self.runtime.paths().colima_profile())
    }
}

impl ContainerRuntime for IncusRuntime {
    fn variant(&self) -> RuntimeVariant {
        RuntimeVariant::Incus
    }

    fn write_config(&self) -> Result<()> {
        Ok(())
    }

    fn up(&self) -> Result<()> {
        let remote = self.remote();
        self.runtime
            .shell
            .exec_silent("incus", &["remote", "switch", &remote])?;
        tracing::info!(%remote, "incus remote selected");
        Ok(())
    }

    fn down(&self) -> Result<()> {
        if let Err(e) = self
            .runtime
            .shell
            .exec_silent("incus", &["remote", "switch", "local"])
        {
            tracing::warn!(error = %e, "could not switch incus back to the local remote");
        }
        Ok(())
    }

    fn embedded_vm(&self) -> Option<Arc<dyn VirtualMachine>> {
        Some(Arc::clone(&self.vm))
    }
}
