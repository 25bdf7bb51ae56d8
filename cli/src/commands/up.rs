//! Up command: bring the workstation up and apply infrastructure.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::commands::blocking;
use crate::domain::ConfigOverride;

/// Arguments for the `basecamp up` command.
#[derive(Args)]
pub struct UpArgs {
    /// Set a config value for this run, e.g. `--set vm.cpu=4`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<ConfigOverride>,
}

/// Entry point for `basecamp up`.
///
/// No spinner here: network setup may prompt for a sudo password.
///
/// # Errors
///
/// Returns an error if the privilege check or any bring-up stage fails.
pub async fn run(app: &AppContext, args: UpArgs) -> Result<()> {
    let mut project = app.project(None)?;
    let context = project.context_name().to_string();
    app.output.step(&format!("Bringing up context {context}"));

    let blueprint = blocking(&app.interrupt, move || {
        project.configure(&args.set)?;
        project.initialize(false, None)?;
        project.up()
    })
    .await?;

    app.output.success(&format!(
        "Context {context} is up ({} infrastructure components)",
        blueprint.terraform.len()
    ));
    Ok(())
}
