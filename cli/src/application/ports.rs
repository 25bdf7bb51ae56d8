//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Every port is synchronous and object-safe: the orchestrator chains blocking
//! calls in a fixed order and holds drivers behind `Arc<dyn _>` so variants
//! can be chosen at runtime.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_yaml::{Mapping, Value};

use crate::application::runtime::Runtime;
use crate::domain::compose::ComposeService;
use crate::domain::config::is_dev_context;
use crate::domain::{Blueprint, NetworkVariant, RuntimeVariant, VmVariant, config::keys};

// ── Configuration Port ────────────────────────────────────────────────────────

/// Typed key/value store for one project context.
///
/// Values are layered: persisted/set values over defaults. Keys are dotted
/// paths such as `vm.driver`.
pub trait ConfigHandler: Send + Sync {
    /// Point the handler at a context and its config directory.
    fn use_context(&self, context: &str, config_root: &Path) -> Result<()>;
    /// The context recorded by the last `persist_context`, if any.
    fn stored_context(&self) -> Option<String>;
    /// Record `context` as the project's current context.
    fn persist_context(&self, context: &str) -> Result<()>;

    /// Raw value at `key`, if set or defaulted.
    fn get(&self, key: &str) -> Option<Value>;
    /// Child keys of the mapping at `key`, in configured order.
    fn child_keys(&self, key: &str) -> Vec<String>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Merge `defaults` into the defaults layer; later defaults win.
    fn set_defaults(&self, defaults: Mapping) -> Result<()>;

    /// Value at `key` in the context's persisted config, without loading it.
    fn persisted(&self, key: &str) -> Option<Value>;
    /// Read the context's persisted config; persisted values win over
    /// anything set so far.
    fn load(&self) -> Result<()>;
    /// Persist the config. An existing file is kept unless `overwrite`.
    fn save(&self, overwrite: bool) -> Result<()>;
    /// Remove context-specific generated artifacts (kubeconfig, talosconfig, ...).
    fn clean(&self) -> Result<()>;
    /// Ensure the context has a valid identifier.
    fn generate_context_id(&self) -> Result<()>;

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// An explicit `dev` flag wins; otherwise `local`/`local-*` contexts are dev.
    fn is_dev_mode(&self, context: &str) -> bool {
        self.get_bool(keys::DEV)
            .unwrap_or_else(|| is_dev_context(context))
    }
}

// ── Process Execution Port ────────────────────────────────────────────────────

/// Abstracts process execution so drivers can be swapped or mocked.
///
/// All methods return captured stdout and fail with a
/// [`crate::domain::CommandError`] when the program exits non-zero.
pub trait Shell: Send + Sync {
    /// Run a program with stderr passed through to the user.
    fn exec(&self, program: &str, args: &[&str]) -> Result<String>;
    /// Run a program with all output captured.
    fn exec_silent(&self, program: &str, args: &[&str]) -> Result<String>;
    /// Run a program with elevated privileges, prompting with `message`.
    fn exec_sudo(&self, message: &str, program: &str, args: &[&str]) -> Result<String>;
    /// Root directory of the project this invocation operates on.
    fn project_root(&self) -> Result<PathBuf>;
    /// Token identifying the current shell session.
    fn session_token(&self) -> Result<String>;
}

// ── Filesystem Port ───────────────────────────────────────────────────────────

pub trait LocalFs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    /// Write `content`, creating parent directories.
    fn write(&self, path: &Path, content: &str) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Remove a file or directory tree. Removing an absent path succeeds.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

// ── Process Environment Port ──────────────────────────────────────────────────

/// Variables exported to every child process this invocation spawns.
pub trait ProcessEnv: Send + Sync {
    fn set(&self, key: &str, value: &str);
    fn get(&self, key: &str) -> Option<String>;
    fn vars(&self) -> BTreeMap<String, String>;
}

// ── Tooling Port ──────────────────────────────────────────────────────────────

pub trait ToolsManager: Send + Sync {
    /// Verify that every tool the current config needs is installed.
    fn check(&self) -> Result<()>;
}

// ── Blueprint Port ────────────────────────────────────────────────────────────

/// Loads and renders the desired-infrastructure blueprint.
pub trait Composer: Send + Sync {
    /// Load the blueprint from `url`, or the context's own/default blueprint.
    fn load_blueprint(&self, url: Option<&str>) -> Result<()>;
    /// The loaded blueprint, if `load_blueprint` has succeeded.
    fn blueprint(&self) -> Option<Blueprint>;
    /// Write the blueprint and per-component infrastructure artifacts.
    fn generate(&self, overwrite: bool) -> Result<()>;
}

// ── Provisioner Port ──────────────────────────────────────────────────────────

/// Callback invoked by the provisioner after each component is applied,
/// with the component's name.
pub type ApplyHook = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Drives infrastructure apply and destroy.
pub trait Provisioner: Send + Sync {
    fn up(&self, blueprint: &Blueprint, on_apply: Option<&ApplyHook>) -> Result<()>;
    fn down(&self, blueprint: &Blueprint) -> Result<()>;
}

// ── Workload Port ─────────────────────────────────────────────────────────────

/// A named auxiliary workload run alongside the workstation.
pub trait Service: Send + Sync {
    fn name(&self) -> &str;
    /// `<name>.<domain>`.
    fn hostname(&self) -> String;
    fn address(&self) -> Option<Ipv4Addr>;
    fn set_address(&self, address: Ipv4Addr);
    /// Render any config files the workload needs before it starts.
    fn write_config(&self) -> Result<()>;
    /// Compose definition for container-backed runtimes.
    fn compose_service(&self) -> Option<ComposeService>;

    /// Hand the service the complete service set. Only services that resolve
    /// their peers (DNS) keep it.
    fn set_peers(&self, _peers: &[Arc<dyn Service>]) {}
    /// The peers handed over by `set_peers`.
    fn peers(&self) -> Vec<Arc<dyn Service>> {
        Vec::new()
    }
}

// ── Driver Ports ──────────────────────────────────────────────────────────────

/// Assigns service addresses and wires host, guest, and DNS networking.
pub trait NetworkManager: Send + Sync {
    /// Give every service an address. Runs once, before any config rendering.
    fn assign_ips(&self, services: &[Arc<dyn Service>]) -> Result<()>;
    /// Make the guest forward traffic to the service network.
    fn configure_guest(&self) -> Result<()>;
    /// Route the service network from the host through the guest.
    fn configure_host_route(&self) -> Result<()>;
    /// Point the host resolver at the workstation DNS service.
    fn configure_dns(&self) -> Result<()>;
    /// Whether configuration will need elevated privileges.
    fn needs_privilege(&self) -> bool;
}

pub trait VirtualMachine: Send + Sync {
    fn write_config(&self) -> Result<()>;
    /// Start the VM. On success `address()` reports the guest address.
    fn up(&self) -> Result<()>;
    fn down(&self) -> Result<()>;
    fn address(&self) -> Option<String>;
}

pub trait ContainerRuntime: Send + Sync {
    fn variant(&self) -> RuntimeVariant;
    fn write_config(&self) -> Result<()>;
    fn up(&self) -> Result<()>;
    fn down(&self) -> Result<()>;
    /// A runtime that lives in its own VM hands that VM out here.
    fn embedded_vm(&self) -> Option<Arc<dyn VirtualMachine>> {
        None
    }
}

// ── Component Factory Port ────────────────────────────────────────────────────

/// Builds the concrete collaborators for selected variants.
pub trait ComponentFactory: Send + Sync {
    fn network_manager(&self, variant: NetworkVariant, runtime: &Runtime)
    -> Arc<dyn NetworkManager>;
    fn virtual_machine(&self, variant: VmVariant, runtime: &Runtime) -> Arc<dyn VirtualMachine>;
    fn container_runtime(
        &self,
        variant: RuntimeVariant,
        runtime: &Runtime,
        services: &[Arc<dyn Service>],
    ) -> Box<dyn ContainerRuntime>;
    fn composer(&self, runtime: &Runtime) -> Box<dyn Composer>;
    fn provisioner(&self, runtime: &Runtime) -> Box<dyn Provisioner>;
}
