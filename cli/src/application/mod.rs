//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod network;
pub mod ports;
pub mod runtime;
pub mod services;
pub mod workloads;

pub use ports::{
    ApplyHook, ComponentFactory, Composer, ConfigHandler, ContainerRuntime, LocalFs,
    NetworkManager, ProcessEnv, Provisioner, Service, Shell, ToolsManager, VirtualMachine,
};
pub use runtime::{Runtime, RuntimeBuilder};
