//! Command implementations

pub mod clean;
pub mod down;
pub mod init;
pub mod up;
pub mod version;

use anyhow::{Context, Result};

use crate::infra::shell::Interrupt;

/// Run a blocking project operation off the async runtime.
///
/// Ctrl-C while the operation runs fires `interrupt`: the running child
/// process is killed, later steps refuse to start, and the command ends with
/// an error once the operation has unwound.
///
/// # Errors
///
/// Returns the operation's error, or an error if it panicked or was interrupted.
pub async fn blocking<T, F>(interrupt: &Interrupt, op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(op);
    tokio::select! {
        joined = &mut task => joined.context("operation panicked")?,
        _ = tokio::signal::ctrl_c() => {
            interrupt.trigger();
            match task.await {
                Ok(Err(e)) => tracing::debug!(error = %format!("{e:#}"), "operation stopped"),
                Ok(Ok(_)) => tracing::debug!("operation finished despite interrupt"),
                Err(e) => tracing::warn!(error = %e, "operation panicked after interrupt"),
            }
            anyhow::bail!("interrupted")
        }
    }
}
