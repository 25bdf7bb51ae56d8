//! Docker compose-backed `ContainerRuntime`.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::Runtime;
use crate::application::ports::{ContainerRuntime, Service};
use crate::domain::RuntimeVariant;
use crate::domain::compose::ComposeFile;
use crate::domain::config::{DEFAULT_CIDR, keys};
use crate::domain::network::Cidr;

/// Runs the service set as one compose project per context.
pub struct DockerRuntime {
    runtime: Runtime,
    services: Vec<Arc<dyn Service>>,
}

impl DockerRuntime {
    #[must_use]
    pub fn new(runtime: Runtime, services: Vec<Arc<dyn Service>>) -> Self {
        Self { runtime, services }
    }

    fn project_name(&self) -> String {
        format!("basecamp-{}", self.runtime.context_name)
    }

    /// Render the compose document for the current service set.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured network CIDR is invalid.
    pub fn render(&self) -> Result<String> {
        let cidr: Cidr = self
            .runtime
            .config
            .string_or(keys::NETWORK_CIDR, DEFAULT_CIDR)
            .parse()?;
        let mut file = ComposeFile::new(&cidr);
        for service in &self.services {
            if let Some(fragment) = service.compose_service() {
                file.add_service(
                    service.name(),
                    fragment,
                    service.address().map(|a| a.to_string()),
                );
            }
        }
        serde_yaml::to_string(&file).context("cannot serialize compose file")
    }

    fn compose(&self, args: &[&str]) -> Result<String> {
        let path = self.runtime.paths().compose_file();
        let path = path.display().to_string();
        let project = self.project_name();
        let mut full = vec!["compose", "-f", path.as_str(), "-p", project.as_str()];
        full.extend_from_slice(args);
        self.runtime.shell.exec("docker", &full)
    }
}

impl ContainerRuntime for DockerRuntime {
    fn variant(&self) -> RuntimeVariant {
        RuntimeVariant::Docker
    }

    fn write_config(&self) -> Result<()> {
        let path = self.runtime.paths().compose_file();
        self.runtime.fs.write(&path, &self.render()?)?;
        tracing::debug!(path = %path.display(), services = self.services.len(), "compose file written");
        Ok(())
    }

    fn up(&self) -> Result<()> {
        self.compose(&["up", "-d", "--remove-orphans"])?;
        tracing::info!(project = %self.project_name(), "containers started");
        Ok(())
    }

    fn down(&self) -> Result<()> {
        if !self.runtime.fs.exists(&self.runtime.paths().compose_file()) {
            tracing::debug!("no compose file, nothing to stop");
            return Ok(());
        }
        self.compose(&["down", "--remove-orphans"])?;
        tracing::info!(project = %self.project_name(), "containers stopped");
        Ok(())
    }
}
