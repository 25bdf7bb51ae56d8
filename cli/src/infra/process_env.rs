//! Process-wide environment table exported to child processes.
//!
//! Variables are never written into this process's own environment. The
//! shell adapter applies the table to every command it spawns, so a value
//! set here lives for the rest of the process.

use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use crate::application::ports::ProcessEnv;

static EXPORTED: LazyLock<Mutex<BTreeMap<String, String>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

/// Snapshot of every exported variable.
pub fn exported_vars() -> BTreeMap<String, String> {
    EXPORTED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Production `ProcessEnv` backed by the process-wide table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalProcessEnv;

impl ProcessEnv for GlobalProcessEnv {
    fn set(&self, key: &str, value: &str) {
        EXPORTED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        EXPORTED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn vars(&self) -> BTreeMap<String, String> {
        exported_vars()
    }
}
