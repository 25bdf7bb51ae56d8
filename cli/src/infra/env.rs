//! Host environment read at startup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings loaded from environment variables via `envy`.
///
/// Each field maps to `BASECAMP_<FIELD>`:
///   - `BASECAMP_CONTEXT`        (optional, context to operate on)
///   - `BASECAMP_PROJECT_ROOT`   (optional, skips project root discovery)
///   - `BASECAMP_SESSION_TOKEN`  (optional, identifies the shell session)
///   - `BASECAMP_LOG`            (optional, tracing filter directive)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostEnv {
    pub context: Option<String>,
    pub project_root: Option<PathBuf>,
    pub session_token: Option<String>,
    pub log: Option<String>,
}

impl HostEnv {
    /// # Errors
    ///
    /// Returns an error if a `BASECAMP_*` variable cannot be deserialized.
    pub fn from_env() -> Result<Self> {
        envy::prefixed("BASECAMP_")
            .from_env()
            .context("failed to read BASECAMP_* environment variables")
    }

    /// Like [`HostEnv::from_env`] over an explicit variable list.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be deserialized.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("BASECAMP_")
            .from_iter(vars)
            .context("failed to read BASECAMP_* environment variables")
    }
}
