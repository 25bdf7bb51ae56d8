//! Clean command: remove generated artifacts for the current context.

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::blocking;

/// Entry point for `basecamp clean`.
///
/// # Errors
///
/// Returns an error naming the first path that could not be removed.
pub async fn run(app: &AppContext) -> Result<()> {
    let mut project = app.project(None)?;
    let context = project.context_name().to_string();

    let kept = format!("for context {context}. Your config and blueprint are kept.");
    app.output.notice(&[
        "This removes generated volumes, terraform state, DNS and compose files",
        kept.as_str(),
    ]);
    if !app.assume_yes && !app.confirm("Continue?", false)? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    blocking(&app.interrupt, move || {
        project.configure(&[])?;
        project.perform_cleanup()
    })
    .await?;

    app.output.success(&format!("Cleaned context {context}"));
    Ok(())
}
