//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Invalid or missing configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid override '{0}': expected key=value")]
    MalformedOverride(String),

    #[error("Invalid config key '{0}'")]
    InvalidKey(String),

    #[error("Cannot set '{key}': '{parent}' is not a mapping")]
    NotAMapping { key: String, parent: String },

    #[error("Invalid CIDR block '{0}'")]
    InvalidCidr(String),

    #[error("CIDR block {cidr} has room for {capacity} services, {requested} requested")]
    AddressSpaceExhausted {
        cidr: String,
        capacity: usize,
        requested: usize,
    },

    #[error("Invalid context name '{0}': must match ^[a-z0-9]([a-z0-9-]*[a-z0-9])?$")]
    InvalidContextName(String),

    #[error("Invalid DNS domain '{0}': expected dot-separated hostname labels")]
    InvalidDomain(String),
}

// ── Workstation errors ────────────────────────────────────────────────────────

/// Errors raised by the workstation lifecycle itself.
#[derive(Debug, Error)]
pub enum WorkstationError {
    #[error("no virtual machine found")]
    NoVirtualMachine,

    #[error("virtual machine did not report an address after starting")]
    VmAddressMissing,
}

// ── External command errors ───────────────────────────────────────────────────

/// An external program ran but did not succeed.
#[derive(Debug, Error)]
#[error("{program} failed ({status}): {stderr}")]
pub struct CommandError {
    pub program: String,
    pub status: String,
    pub stderr: String,
}

// ── Pre-flight errors ─────────────────────────────────────────────────────────

/// Raised before any mutation when network setup cannot be performed.
#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error(
        "network configuration requires administrator privileges. \
Run 'sudo -v' first or configure passwordless sudo."
    )]
    Required,
}

// ── Tooling errors ────────────────────────────────────────────────────────────

/// Required host tooling is missing.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("required tool '{tool}' is not installed or not on PATH")]
    NotFound { tool: String },
}

// ── Project errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("blueprint not loaded. Run 'basecamp init' first.")]
    BlueprintNotLoaded,
}
