//! Environment variables exported for a project context.

use std::collections::BTreeMap;
use std::path::Path;

/// Cache-disable flag set by `Workstation::up`; never cleared in-process.
pub const NO_CACHE_VAR: &str = "BASECAMP_NO_CACHE";

/// Config flags the exported environment depends on.
pub struct EnvironmentInputs<'a> {
    pub context: &'a str,
    pub project_root: &'a Path,
    pub config_root: &'a Path,
    pub localstack_address: Option<&'a str>,
    /// Docker socket of the colima profile when the VM driver is colima.
    pub colima_socket: Option<&'a Path>,
}

fn display(p: &Path) -> String {
    p.display().to_string()
}

/// Compute the variables a shell in this project should see.
#[must_use]
pub fn project_environment(inputs: &EnvironmentInputs<'_>) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("BASECAMP_CONTEXT".to_string(), inputs.context.to_string());
    vars.insert(
        "BASECAMP_PROJECT_ROOT".to_string(),
        display(inputs.project_root),
    );
    vars.insert(
        "KUBECONFIG".to_string(),
        display(&inputs.config_root.join(".kube").join("config")),
    );
    vars.insert(
        "TALOSCONFIG".to_string(),
        display(&inputs.config_root.join(".talos").join("config")),
    );
    if let Some(address) = inputs.localstack_address {
        vars.insert(
            "AWS_ENDPOINT_URL".to_string(),
            format!("http://{address}:4566"),
        );
    }
    if let Some(socket) = inputs.colima_socket {
        vars.insert(
            "DOCKER_HOST".to_string(),
            format!("unix://{}", socket.display()),
        );
    }
    vars
}
