//! Infrastructure implementation of the `ToolsManager` port.

use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::{ConfigHandler, Shell, ToolsManager};
use crate::domain::ToolError;
use crate::domain::config::{PROVIDER_GENERIC, keys};
use crate::domain::tools::{ToolInputs, required_tools};

/// Checks that each required binary runs and reports a version.
pub struct BinaryToolsManager {
    config: Arc<dyn ConfigHandler>,
    shell: Arc<dyn Shell>,
}

impl BinaryToolsManager {
    #[must_use]
    pub fn new(config: Arc<dyn ConfigHandler>, shell: Arc<dyn Shell>) -> Self {
        Self { config, shell }
    }
}

impl ToolsManager for BinaryToolsManager {
    fn check(&self) -> Result<()> {
        let vm_driver = self.config.string_or(keys::VM_DRIVER, "");
        let provider = self.config.string_or(keys::PROVIDER, PROVIDER_GENERIC);
        let tools = required_tools(&ToolInputs {
            docker_enabled: self.config.bool_or(keys::DOCKER_ENABLED, false),
            vm_driver: &vm_driver,
            provider: &provider,
            terraform_enabled: self.config.bool_or(keys::TERRAFORM_ENABLED, true),
        });
        for tool in tools {
            match self.shell.exec_silent(tool.binary, tool.version_args) {
                Ok(version) => {
                    tracing::debug!(tool = tool.binary, version = version.trim(), "tool found");
                }
                Err(e) => {
                    tracing::debug!(tool = tool.binary, error = %e, "tool check failed");
                    return Err(ToolError::NotFound {
                        tool: tool.binary.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
