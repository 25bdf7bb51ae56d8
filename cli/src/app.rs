//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the output context and behaviour flags, and wires the
//! production adapters into a [`Project`].

use std::sync::Arc;

use anyhow::Result;

use crate::application::Runtime;
use crate::application::ports::{ConfigHandler, Shell};
use crate::application::services::{Project, ProjectOverrides};
use crate::infra::components::HostComponents;
use crate::infra::config::YamlConfigHandler;
use crate::infra::env::HostEnv;
use crate::infra::fs::StdFs;
use crate::infra::process_env::GlobalProcessEnv;
use crate::infra::shell::{Interrupt, StdShell};
use crate::infra::tools::BinaryToolsManager;
use crate::output::OutputContext;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `BASECAMP_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
    /// Context named on the command line or by `BASECAMP_CONTEXT`.
    pub context: Option<String>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    /// `--yes` was passed: destructive prompts are answered yes.
    pub assume_yes: bool,
    pub context: Option<String>,
    pub host: HostEnv,
    /// Fired on Ctrl-C; kills the running child of every shell built here.
    pub interrupt: Interrupt,
}

impl AppContext {
    #[must_use]
    pub fn new(flags: AppFlags, host: HostEnv) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("BASECAMP_YES").is_ok();
        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            non_interactive: flags.behaviour.yes || ci_env,
            assume_yes: flags.behaviour.yes,
            context: flags.context,
            host,
            interrupt: Interrupt::default(),
        }
    }

    /// Build the production runtime for the current project directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the project root cannot be determined.
    pub fn runtime(&self) -> Result<Runtime> {
        let shell: Arc<dyn Shell> = Arc::new(
            StdShell::new(
                self.host.project_root.clone(),
                self.host.session_token.clone(),
            )
            .with_interrupt(self.interrupt.clone()),
        );
        let root = shell.project_root()?;
        let config: Arc<dyn ConfigHandler> = Arc::new(YamlConfigHandler::new(&root));
        let tools = Arc::new(BinaryToolsManager::new(
            Arc::clone(&config),
            Arc::clone(&shell),
        ));
        Runtime::builder()
            .config(config)
            .shell(shell)
            .fs(Arc::new(StdFs))
            .env(Arc::new(GlobalProcessEnv))
            .tools(tools)
            .project_root(root)
            .home_dir(dirs::home_dir())
            .build()
    }

    /// Build the project for `context`, falling back to the global context.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built or the context is invalid.
    pub fn project(&self, context: Option<&str>) -> Result<Project> {
        Project::new(
            self.runtime()?,
            context.or(self.context.as_deref()),
            Arc::new(HostComponents),
            ProjectOverrides::default(),
        )
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `BASECAMP_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
