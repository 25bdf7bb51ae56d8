//! Fixed per-project layout.

use std::path::{Path, PathBuf};

/// Hidden directory holding generated state under the project root.
pub const STATE_DIR: &str = ".basecamp";
/// Directory holding per-context user configuration under the project root.
pub const CONTEXTS_DIR: &str = "contexts";
/// Per-context config file name.
pub const CONFIG_FILE: &str = "basecamp.yaml";
/// Per-context blueprint file name.
pub const BLUEPRINT_FILE: &str = "blueprint.yaml";

/// Paths derived from the project root and context name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
    context: String,
}

impl ProjectPaths {
    #[must_use]
    pub fn new(root: &Path, context: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            context: context.to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/contexts/<context>`: user-owned configuration.
    #[must_use]
    pub fn config_root(&self) -> PathBuf {
        self.root.join(CONTEXTS_DIR).join(&self.context)
    }

    /// `<root>/contexts/_template`: blueprint templates.
    #[must_use]
    pub fn template_root(&self) -> PathBuf {
        self.root.join(CONTEXTS_DIR).join("_template")
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// File recording the last selected context.
    #[must_use]
    pub fn context_file(&self) -> PathBuf {
        self.state_dir().join("context")
    }

    #[must_use]
    pub fn volumes_dir(&self) -> PathBuf {
        self.root.join(".volumes")
    }

    /// Per-context infrastructure working directory.
    #[must_use]
    pub fn terraform_dir(&self) -> PathBuf {
        self.state_dir()
            .join(CONTEXTS_DIR)
            .join(&self.context)
            .join("terraform")
    }

    #[must_use]
    pub fn corefile(&self) -> PathBuf {
        self.state_dir().join("Corefile")
    }

    #[must_use]
    pub fn compose_file(&self) -> PathBuf {
        self.state_dir().join("compose.yaml")
    }

    /// Generated artifacts removed by cleanup, in removal order.
    #[must_use]
    pub fn cleanup_targets(&self) -> [PathBuf; 4] {
        [
            self.volumes_dir(),
            self.terraform_dir(),
            self.corefile(),
            self.compose_file(),
        ]
    }

    /// Colima profile dedicated to this context.
    #[must_use]
    pub fn colima_profile(&self) -> String {
        format!("basecamp-{}", self.context)
    }
}
