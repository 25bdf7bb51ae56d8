//! Shared execution context for one invocation.
//!
//! A [`Runtime`] is built once and cloned into every collaborator. The port
//! handles are shared; the context name and derived roots are fixed when the
//! project is constructed.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::application::ports::{ConfigHandler, LocalFs, ProcessEnv, Shell, ToolsManager};
use crate::domain::config::{VM_DRIVER_COLIMA, keys};
use crate::domain::environment::{EnvironmentInputs, project_environment};
use crate::domain::{ProjectPaths, context::DEFAULT_CONTEXT};

#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<dyn ConfigHandler>,
    pub shell: Arc<dyn Shell>,
    pub fs: Arc<dyn LocalFs>,
    pub env: Arc<dyn ProcessEnv>,
    pub tools: Arc<dyn ToolsManager>,
    pub context_name: String,
    pub project_root: PathBuf,
    pub config_root: PathBuf,
    pub template_root: PathBuf,
    /// User home, used to locate VM driver state such as the colima socket.
    pub home_dir: Option<PathBuf>,
    loaded_session: Arc<Mutex<Option<String>>>,
}

impl Runtime {
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Fixed artifact locations for the current context.
    #[must_use]
    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(&self.project_root, &self.context_name)
    }

    /// Switch to `context`, recomputing the config and template roots.
    pub fn set_context(&mut self, context: &str) {
        let paths = ProjectPaths::new(&self.project_root, context);
        self.context_name = context.to_string();
        self.config_root = paths.config_root();
        self.template_root = paths.template_root();
    }

    /// Export the project's environment to child processes.
    ///
    /// A non-forced load is skipped when it already ran in the current shell
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session token cannot be determined.
    pub fn load_environment(&self, force: bool) -> Result<()> {
        let token = self
            .shell
            .session_token()
            .context("failed to determine shell session")?;
        let mut loaded = self
            .loaded_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !force && loaded.as_deref() == Some(token.as_str()) {
            tracing::debug!(session = %token, "environment already loaded");
            return Ok(());
        }

        let localstack_address = self
            .config
            .bool_or(keys::LOCALSTACK_ENABLED, false)
            .then(|| self.config.get_string(keys::LOCALSTACK_ADDRESS))
            .flatten();
        let colima_socket = (self.config.string_or(keys::VM_DRIVER, "") == VM_DRIVER_COLIMA)
            .then(|| self.home_dir.as_deref().map(|home| self.colima_socket(home)))
            .flatten();

        let vars = project_environment(&EnvironmentInputs {
            context: &self.context_name,
            project_root: &self.project_root,
            config_root: &self.config_root,
            localstack_address: localstack_address.as_deref(),
            colima_socket: colima_socket.as_deref(),
        });
        for (key, value) in &vars {
            self.env.set(key, value);
        }
        tracing::debug!(count = vars.len(), force, "environment loaded");
        *loaded = Some(token);
        Ok(())
    }

    fn colima_socket(&self, home: &Path) -> PathBuf {
        home.join(".colima")
            .join(self.paths().colima_profile())
            .join("docker.sock")
    }
}

/// Assembles a [`Runtime`] from its port handles.
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Option<Arc<dyn ConfigHandler>>,
    shell: Option<Arc<dyn Shell>>,
    fs: Option<Arc<dyn LocalFs>>,
    env: Option<Arc<dyn ProcessEnv>>,
    tools: Option<Arc<dyn ToolsManager>>,
    project_root: Option<PathBuf>,
    home_dir: Option<PathBuf>,
}

impl RuntimeBuilder {
    #[must_use]
    pub fn config(mut self, config: Arc<dyn ConfigHandler>) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = Some(shell);
        self
    }

    #[must_use]
    pub fn fs(mut self, fs: Arc<dyn LocalFs>) -> Self {
        self.fs = Some(fs);
        self
    }

    #[must_use]
    pub fn env(mut self, env: Arc<dyn ProcessEnv>) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<dyn ToolsManager>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Use `root` instead of asking the shell for the project root.
    #[must_use]
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = home;
        self
    }

    /// Build the runtime for the default context.
    ///
    /// # Panics
    ///
    /// Panics if any port handle was not supplied. A missing collaborator is
    /// a wiring bug, not a runtime condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the project root cannot be determined.
    pub fn build(self) -> Result<Runtime> {
        let (Some(config), Some(shell), Some(fs), Some(env), Some(tools)) =
            (self.config, self.shell, self.fs, self.env, self.tools)
        else {
            panic!("runtime requires config, shell, fs, env and tools handles");
        };
        let project_root = match self.project_root {
            Some(root) => root,
            None => shell
                .project_root()
                .context("failed to determine project root")?,
        };
        let paths = ProjectPaths::new(&project_root, DEFAULT_CONTEXT);
        Ok(Runtime {
            config,
            shell,
            fs,
            env,
            tools,
            context_name: DEFAULT_CONTEXT.to_string(),
            config_root: paths.config_root(),
            template_root: paths.template_root(),
            project_root,
            home_dir: self.home_dir,
            loaded_session: Arc::new(Mutex::new(None)),
        })
    }
}
