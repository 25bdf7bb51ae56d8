//! Host tooling the configured drivers depend on.

/// A binary and the arguments that make it print its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    pub binary: &'static str,
    pub version_args: &'static [&'static str],
}

const DOCKER: Tool = Tool {
    binary: "docker",
    version_args: &["version", "--format", "{{.Client.Version}}"],
};
const COMPOSE: Tool = Tool {
    binary: "docker",
    version_args: &["compose", "version", "--short"],
};
const COLIMA: Tool = Tool {
    binary: "colima",
    version_args: &["version"],
};
const TERRAFORM: Tool = Tool {
    binary: "terraform",
    version_args: &["version"],
};

pub struct ToolInputs<'a> {
    pub docker_enabled: bool,
    pub vm_driver: &'a str,
    pub provider: &'a str,
    pub terraform_enabled: bool,
}

/// Tools required by the current configuration, in check order.
#[must_use]
pub fn required_tools(inputs: &ToolInputs<'_>) -> Vec<Tool> {
    let mut tools = Vec::new();
    if inputs.docker_enabled && inputs.provider != crate::domain::config::PROVIDER_INCUS {
        tools.extend([DOCKER, COMPOSE]);
    }
    if inputs.vm_driver == crate::domain::config::VM_DRIVER_COLIMA {
        tools.push(COLIMA);
    }
    if inputs.terraform_enabled {
        tools.push(TERRAFORM);
    }
    tools
}
