//! Infrastructure implementation of the `Shell` port.
//!
//! `StdShell` runs programs with `tokio::process`, applying the process-wide
//! export table to every child. Children are spawned with `kill_on_drop`, so
//! a fired [`Interrupt`] kills whatever is running.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::watch;

use crate::application::ports::Shell;
use crate::domain::CommandError;
use crate::domain::context::random_hex;
use crate::domain::paths::{CONTEXTS_DIR, STATE_DIR};
use crate::infra::process_env::exported_vars;

/// Cancellation shared by the command layer and the shells it builds.
///
/// Once triggered it stays triggered: the running child is killed and every
/// later command fails without spawning.
#[derive(Debug, Clone)]
pub struct Interrupt(Arc<watch::Sender<bool>>);

impl Default for Interrupt {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self(Arc::new(tx))
    }
}

impl Interrupt {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    async fn triggered(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives in `self`, so a closed channel never fires.
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Production `Shell`.
#[derive(Debug, Clone, Default)]
pub struct StdShell {
    project_root: Option<PathBuf>,
    session_token: Option<String>,
    interrupt: Interrupt,
}

impl StdShell {
    #[must_use]
    pub fn new(project_root: Option<PathBuf>, session_token: Option<String>) -> Self {
        Self {
            project_root,
            session_token,
            interrupt: Interrupt::default(),
        }
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn command(program: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).envs(exported_vars()).kill_on_drop(true);
        cmd
    }

    /// Spawn `cmd` and wait for it, unless the interrupt fires first.
    fn run(&self, program: &str, mut cmd: Command) -> Result<Output> {
        if self.interrupt.is_triggered() {
            anyhow::bail!("interrupted before {program} could start");
        }
        block_on(async {
            let child = cmd
                .spawn()
                .with_context(|| format!("failed to spawn {program}"))?;
            tokio::select! {
                output = child.wait_with_output() => {
                    output.with_context(|| format!("waiting for {program}"))
                }
                () = self.interrupt.triggered() => {
                    tracing::debug!(program, "killed by interrupt");
                    anyhow::bail!("{program} interrupted")
                }
            }
        })
    }

    fn finish(program: &str, output: Output) -> Result<String> {
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let status = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| format!("exit {c}"));
        Err(CommandError {
            program: program.to_string(),
            status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into())
    }
}

/// Drive `fut` on the ambient runtime from a blocking thread, or on a
/// throwaway current-thread runtime when there is none.
fn block_on<F>(fut: F) -> Result<Output>
where
    F: Future<Output = Result<Output>>,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.block_on(fut),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("cannot start process runtime")?
            .block_on(fut),
    }
}

/// Walk up from `start` to the first directory holding `contexts/` or `.basecamp/`.
#[must_use]
pub fn discover_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONTEXTS_DIR).is_dir() || dir.join(STATE_DIR).is_dir())
        .map(Path::to_path_buf)
}

impl Shell for StdShell {
    fn exec(&self, program: &str, args: &[&str]) -> Result<String> {
        tracing::debug!(program, ?args, "exec");
        let mut cmd = Self::command(program, args);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let output = self.run(program, cmd)?;
        Self::finish(program, output)
    }

    fn exec_silent(&self, program: &str, args: &[&str]) -> Result<String> {
        tracing::debug!(program, ?args, "exec (silent)");
        let mut cmd = Self::command(program, args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let output = self.run(program, cmd)?;
        Self::finish(program, output)
    }

    fn exec_sudo(&self, message: &str, program: &str, args: &[&str]) -> Result<String> {
        tracing::debug!(program, ?args, "exec (sudo)");
        let prompt = format!("{message}\nPassword for %u: ");
        let mut sudo_args = vec!["-p", prompt.as_str(), "--", program];
        sudo_args.extend_from_slice(args);
        let mut cmd = Self::command("sudo", &sudo_args);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let output = self.run("sudo", cmd)?;
        Self::finish(program, output)
    }

    fn project_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.project_root {
            return Ok(root.clone());
        }
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        Ok(discover_project_root(&cwd).unwrap_or(cwd))
    }

    fn session_token(&self) -> Result<String> {
        static PROCESS_TOKEN: OnceLock<String> = OnceLock::new();
        Ok(self
            .session_token
            .clone()
            .unwrap_or_else(|| PROCESS_TOKEN.get_or_init(random_hex).clone()))
    }
}
