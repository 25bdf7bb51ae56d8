//! Colima-backed `VirtualMachine`.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::application::Runtime;
use crate::application::ports::VirtualMachine;
use crate::domain::config::keys;
use crate::domain::vm::{ColimaConfig, parse_colima_address};

/// A colima profile named after the project context.
pub struct ColimaVm {
    runtime: Runtime,
    container_runtime: String,
    address: Mutex<Option<String>>,
}

impl ColimaVm {
    /// `container_runtime` is what colima runs inside the guest: `docker` or `incus`.
    #[must_use]
    pub fn new(runtime: Runtime, container_runtime: &str) -> Self {
        Self {
            runtime,
            container_runtime: container_runtime.to_string(),
            address: Mutex::new(None),
        }
    }

    fn profile(&self) -> String {
        self.runtime.paths().colima_profile()
    }

    fn config_path(&self) -> Result<PathBuf> {
        let home = self
            .runtime
            .home_dir
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".colima").join(self.profile()).join("colima.yaml"))
    }

    fn sized_config(&self) -> ColimaConfig {
        let host_cpus = std::thread::available_parallelism()
            .ok()
            .and_then(|n| u32::try_from(n.get()).ok())
            .unwrap_or(4);
        let mut config = ColimaConfig::sized_for_host(host_cpus, &self.container_runtime);
        let handler = &self.runtime.config;
        let int = |key: &str| handler.get_int(key).and_then(|n| u32::try_from(n).ok());
        if let Some(cpu) = int(keys::VM_CPU) {
            config.cpu = cpu;
        }
        if let Some(memory) = int(keys::VM_MEMORY) {
            config.memory = memory;
        }
        if let Some(disk) = int(keys::VM_DISK) {
            config.disk = disk;
        }
        if let Some(arch) = handler.get_string(keys::VM_ARCH) {
            config.arch = arch;
        }
        config
    }
}

impl VirtualMachine for ColimaVm {
    fn write_config(&self) -> Result<()> {
        let path = self.config_path()?;
        let content =
            serde_yaml::to_string(&self.sized_config()).context("cannot serialize colima config")?;
        self.runtime.fs.write(&path, &content)?;
        tracing::debug!(path = %path.display(), "colima config written");
        Ok(())
    }

    fn up(&self) -> Result<()> {
        let profile = self.profile();
        self.runtime
            .shell
            .exec("colima", &["start", "--profile", &profile])?;
        let listing = self
            .runtime
            .shell
            .exec_silent("colima", &["ls", "--json"])
            .context("failed to list colima profiles")?;
        let address = parse_colima_address(&listing, &profile);
        if let Some(address) = &address {
            self.runtime
                .config
                .set(keys::VM_ADDRESS, address.clone().into())?;
        }
        tracing::info!(%profile, ?address, "colima started");
        *self.address.lock().unwrap_or_else(PoisonError::into_inner) = address;
        Ok(())
    }

    fn down(&self) -> Result<()> {
        let profile = self.profile();
        self.runtime
            .shell
            .exec("colima", &["stop", "--profile", &profile])?;
        tracing::info!(%profile, "colima stopped");
        Ok(())
    }

    fn address(&self) -> Option<String> {
        self.address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
