//! Version command: the build's version and the host it was built for.

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BuildInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    fn render(&self, json: bool) -> Result<String> {
        if json {
            return serde_json::to_string(self).context("cannot serialize version");
        }
        Ok(format!("basecamp {}", self.version))
    }
}

/// Entry point for `basecamp version`.
///
/// # Errors
///
/// Returns an error if the JSON form cannot be serialized.
pub fn run(json: bool) -> Result<()> {
    println!("{}", BuildInfo::current().render(json)?);
    Ok(())
}
