//! Down command: tear down infrastructure and stop the workstation.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::DownOptions;
use crate::commands::blocking;

/// Arguments for the `basecamp down` command.
#[derive(Args)]
pub struct DownArgs {
    /// Remove generated artifacts after stopping.
    #[arg(long)]
    pub clean: bool,

    /// Leave provisioned infrastructure in place.
    #[arg(long)]
    pub skip_infra: bool,
}

/// Entry point for `basecamp down`.
///
/// # Errors
///
/// Returns an error naming the component that failed to stop.
pub async fn run(app: &AppContext, args: DownArgs) -> Result<()> {
    let mut project = app.project(None)?;
    let context = project.context_name().to_string();
    app.output.step(&format!("Tearing down context {context}"));
    if args.skip_infra {
        app.output.warn("Leaving provisioned infrastructure in place");
    }

    let options = DownOptions {
        skip_infra: args.skip_infra,
        clean: args.clean,
    };
    blocking(&app.interrupt, move || {
        project.configure(&[])?;
        project.down(options)
    })
    .await?;

    app.output.success(&format!("Context {context} is down"));
    Ok(())
}
