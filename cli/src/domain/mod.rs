//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod blueprint;
pub mod compose;
pub mod config;
pub mod context;
pub mod dns;
pub mod driver;
pub mod environment;
pub mod error;
pub mod network;
pub mod paths;
pub mod service;
pub mod tools;
pub mod vm;

pub use blueprint::{Blueprint, TerraformComponent};
pub use config::ConfigOverride;
pub use driver::{DriverPlan, NetworkVariant, RuntimeVariant, VmVariant, select_drivers};
pub use error::{CommandError, ConfigError, PrivilegeError, ProjectError, ToolError, WorkstationError};
pub use paths::ProjectPaths;
