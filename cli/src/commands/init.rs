//! Init command: configure a context and generate its artifacts.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::blocking;
use crate::domain::ConfigOverride;
use crate::output::progress;

/// Arguments for the `basecamp init` command.
#[derive(Args)]
pub struct InitArgs {
    /// Context to initialize. Defaults to the current context, else `local`.
    pub context: Option<String>,

    /// Overwrite existing config and generated files.
    #[arg(long)]
    pub reset: bool,

    /// Blueprint to load: an HTTP(S) URL or a local path.
    #[arg(long)]
    pub blueprint: Option<String>,

    /// Set a config value, e.g. `--set dns.enabled=false`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<ConfigOverride>,
}

/// Entry point for `basecamp init`.
///
/// # Errors
///
/// Returns an error if any configuration or generation stage fails.
pub async fn run(app: &AppContext, args: InitArgs) -> Result<()> {
    let InitArgs {
        context,
        reset,
        blueprint,
        set,
    } = args;
    let mut project = app.project(context.as_deref())?;
    let pb = progress::maybe_spinner(
        app.output.show_progress(),
        &format!("Initializing context {}", project.context_name()),
    );

    let result = blocking(&app.interrupt, move || {
        project.configure(&set)?;
        project.initialize(reset, blueprint.as_deref())?;
        project
            .runtime()
            .config
            .persist_context(project.context_name())?;
        Ok(project.context_name().to_string())
    })
    .await;

    match result {
        Ok(context) => {
            progress::finish_ok(&pb, &format!("Initialized context {context}"));
            Ok(())
        }
        Err(e) => {
            progress::finish_error(&pb, "Initialization failed");
            Err(e)
        }
    }
}
