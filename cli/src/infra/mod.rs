//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, config
//! files, the process environment, VM and container drivers, blueprint
//! generation, and terraform.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod colima;
pub mod components;
pub mod composer;
pub mod config;
pub mod docker;
pub mod env;
pub mod fs;
pub mod incus;
pub mod process_env;
pub mod shell;
pub mod terraform;
pub mod tools;
