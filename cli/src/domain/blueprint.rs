//! Blueprint schema: the declarative description of desired infrastructure.

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

pub const BLUEPRINT_KIND: &str = "Blueprint";
pub const BLUEPRINT_API_VERSION: &str = "basecamp.dev/v1alpha1";

/// Component whose apply creates the resources workstation networking needs.
pub const WORKSTATION_COMPONENT: &str = "workstation";

/// Top-level blueprint document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Infrastructure components, applied in order.
    #[serde(default)]
    pub terraform: Vec<TerraformComponent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One infrastructure module applied by the provisioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformComponent {
    /// Name used for apply hooks; defaults to the last path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Working directory relative to the context's terraform directory.
    pub path: String,
    /// Module source; when absent the working directory is used as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub inputs: Mapping,
}

impl TerraformComponent {
    #[must_use]
    pub fn name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

impl Blueprint {
    /// Blueprint used when a context has none of its own.
    #[must_use]
    pub fn default_for(context: &str) -> Self {
        Self {
            kind: default_kind(),
            api_version: default_api_version(),
            metadata: Metadata {
                name: context.to_string(),
                description: Some(format!("Default blueprint for context {context}")),
            },
            terraform: Vec::new(),
        }
    }

    /// Whether any component resolves to `name`.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.terraform.iter().any(|c| c.name() == name)
    }
}

fn default_kind() -> String {
    BLUEPRINT_KIND.to_string()
}

fn default_api_version() -> String {
    BLUEPRINT_API_VERSION.to_string()
}
