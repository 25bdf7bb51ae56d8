//! Configuration keys, defaults, and the decisions derived from them.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::domain::error::ConfigError;

// ── Keys ─────────────────────────────────────────────────────────────────────

/// Dotted configuration keys understood by the orchestrator.
pub mod keys {
    pub const ID: &str = "id";
    pub const DEV: &str = "dev";
    pub const PROVIDER: &str = "provider";
    pub const WORKSTATION_ENABLED: &str = "workstation.enabled";

    pub const VM_DRIVER: &str = "vm.driver";
    pub const VM_RUNTIME: &str = "vm.runtime";
    pub const VM_ADDRESS: &str = "vm.address";
    pub const VM_CPU: &str = "vm.cpu";
    pub const VM_MEMORY: &str = "vm.memory";
    pub const VM_DISK: &str = "vm.disk";
    pub const VM_ARCH: &str = "vm.arch";

    pub const DOCKER_ENABLED: &str = "docker.enabled";
    pub const DOCKER_REGISTRIES: &str = "docker.registries";

    pub const DNS_ENABLED: &str = "dns.enabled";
    pub const DNS_DOMAIN: &str = "dns.domain";
    pub const DNS_ADDRESS: &str = "dns.address";

    pub const GIT_LIVERELOAD_ENABLED: &str = "git.livereload.enabled";
    pub const GIT_LIVERELOAD_IMAGE: &str = "git.livereload.image";
    pub const LOCALSTACK_ENABLED: &str = "aws.localstack.enabled";
    pub const LOCALSTACK_SERVICES: &str = "aws.localstack.services";
    pub const LOCALSTACK_ADDRESS: &str = "aws.localstack.address";

    pub const NETWORK_CIDR: &str = "network.cidr_block";

    pub const CLUSTER_DRIVER: &str = "cluster.driver";
    pub const CONTROLPLANES_COUNT: &str = "cluster.controlplanes.count";
    pub const WORKERS_COUNT: &str = "cluster.workers.count";

    pub const TERRAFORM_ENABLED: &str = "terraform.enabled";
}

pub const DEFAULT_CIDR: &str = "10.5.0.0/16";
pub const DEFAULT_DOMAIN: &str = "test";

pub const VM_DRIVER_COLIMA: &str = "colima";
pub const PROVIDER_GENERIC: &str = "generic";
pub const PROVIDER_INCUS: &str = "incus";
pub const RUNTIME_INCUS: &str = "incus";

// ── Overrides ────────────────────────────────────────────────────────────────

/// A single `key=value` flag override. The value is parsed as a YAML scalar,
/// so `true` becomes a bool and `3` an integer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverride {
    pub key: String,
    pub value: Value,
}

impl FromStr for ConfigOverride {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedOverride(s.to_string()))?;
        let key = key.trim();
        validate_key(key)?;
        let value = serde_yaml::from_str::<Value>(raw)
            .ok()
            .filter(|v| !matches!(v, Value::Mapping(_) | Value::Sequence(_) | Value::Null))
            .unwrap_or_else(|| Value::String(raw.to_string()));
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

/// Finds the override for `key`, if any.
#[must_use]
pub fn override_for<'a>(overrides: &'a [ConfigOverride], key: &str) -> Option<&'a Value> {
    overrides.iter().rev().find(|o| o.key == key).map(|o| &o.value)
}

/// Builds a nested mapping from a list of overrides.
///
/// # Errors
///
/// Returns an error if two overrides conflict structurally (e.g. `a=1` and `a.b=2`).
pub fn overrides_mapping(overrides: &[ConfigOverride]) -> Result<Mapping, ConfigError> {
    let mut mapping = Mapping::new();
    for o in overrides {
        insert(&mut mapping, &o.key, o.value.clone())?;
    }
    Ok(mapping)
}

// ── Dotted-key access ────────────────────────────────────────────────────────

/// Rejects empty keys and keys with empty segments.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidKey`] for keys like `""`, `"a..b"` or `".a"`.
pub fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Looks up a dotted key in a mapping.
#[must_use]
pub fn lookup<'a>(root: &'a Mapping, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = segments.next()?;
    let mut current = root.get(first)?;
    for segment in segments {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

/// Inserts `value` at a dotted key, creating intermediate mappings.
///
/// # Errors
///
/// Returns an error if the key is invalid or an intermediate value exists
/// and is not a mapping.
pub fn insert(root: &mut Mapping, key: &str, value: Value) -> Result<(), ConfigError> {
    validate_key(key)?;
    let segments: Vec<&str> = key.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ConfigError::InvalidKey(key.to_string()))?;

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(Value::String((*segment).to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = entry
            .as_mapping_mut()
            .ok_or_else(|| ConfigError::NotAMapping {
                key: key.to_string(),
                parent: segments[..=depth].join("."),
            })?;
    }
    current.insert(Value::String((*last).to_string()), value);
    Ok(())
}

/// Deep-merges `overlay` into `base`; values in `overlay` win.
pub fn merge_over(base: &mut Mapping, overlay: &Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_over(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn tree(entries: &[(&str, Value)]) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, value) in entries {
        // Keys are compile-time constants and never collide structurally.
        let _ = insert(&mut mapping, key, value.clone());
    }
    mapping
}

/// Base configuration defaults for a context.
#[must_use]
pub fn default_config(dev_mode: bool) -> Mapping {
    let mut entries = vec![
        (keys::DOCKER_ENABLED, Value::Bool(dev_mode)),
        (keys::DNS_ENABLED, Value::Bool(dev_mode)),
        (keys::DNS_DOMAIN, Value::from(DEFAULT_DOMAIN)),
        (keys::GIT_LIVERELOAD_ENABLED, Value::Bool(dev_mode)),
        (keys::LOCALSTACK_ENABLED, Value::Bool(false)),
        (keys::NETWORK_CIDR, Value::from(DEFAULT_CIDR)),
        (keys::CONTROLPLANES_COUNT, Value::from(1)),
        (keys::WORKERS_COUNT, Value::from(1)),
        (keys::TERRAFORM_ENABLED, Value::Bool(true)),
    ];
    if dev_mode {
        entries.push((keys::CLUSTER_DRIVER, Value::from("talos")));
        if cfg!(target_os = "macos") {
            entries.push((keys::VM_DRIVER, Value::from(VM_DRIVER_COLIMA)));
        }
    }
    tree(&entries)
}

/// Defaults layered on top of [`default_config`] for a given provider.
#[must_use]
pub fn provider_defaults(provider: &str) -> Mapping {
    match provider {
        PROVIDER_GENERIC => tree(&[(keys::CLUSTER_DRIVER, Value::from("talos"))]),
        PROVIDER_INCUS => tree(&[
            (keys::VM_DRIVER, Value::from(VM_DRIVER_COLIMA)),
            (keys::VM_RUNTIME, Value::from(RUNTIME_INCUS)),
            (keys::CLUSTER_DRIVER, Value::from("talos")),
        ]),
        "aws" => tree(&[
            ("aws.enabled", Value::Bool(true)),
            (keys::DOCKER_ENABLED, Value::Bool(false)),
        ]),
        "azure" => tree(&[
            ("azure.enabled", Value::Bool(true)),
            (keys::DOCKER_ENABLED, Value::Bool(false)),
        ]),
        _ => Mapping::new(),
    }
}

// ── Decisions ────────────────────────────────────────────────────────────────

/// Inputs for [`default_provider`].
pub struct ProviderInputs<'a> {
    pub dev_mode: bool,
    pub provider_overridden: bool,
    pub current_provider: Option<&'a str>,
    pub vm_driver: Option<&'a str>,
    pub vm_runtime: Option<&'a str>,
}

/// The provider value `configure` should set, if any.
///
/// A `provider` flag override always wins and yields `None` here. A colima VM
/// running the incus runtime implies the incus provider. Otherwise dev mode
/// falls back to `generic` when nothing is set.
#[must_use]
pub fn default_provider(inputs: &ProviderInputs<'_>) -> Option<&'static str> {
    if inputs.provider_overridden {
        return None;
    }
    if inputs.vm_driver == Some(VM_DRIVER_COLIMA) && inputs.vm_runtime == Some(RUNTIME_INCUS) {
        return Some(PROVIDER_INCUS);
    }
    if inputs.dev_mode && inputs.current_provider.is_none_or(str::is_empty) {
        return Some(PROVIDER_GENERIC);
    }
    None
}

/// Contexts named `local` or `local-*` are development contexts.
#[must_use]
pub fn is_dev_context(context: &str) -> bool {
    context == "local" || context.starts_with("local-")
}

/// The single predicate deciding whether a project carries a workstation.
#[must_use]
pub fn workstation_active(dev_mode: bool, workstation_enabled: Option<bool>) -> bool {
    dev_mode || workstation_enabled.unwrap_or(false)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
