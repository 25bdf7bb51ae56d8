//! Infrastructure implementation of the `ConfigHandler` port.
//!
//! Config lives in `<project>/contexts/<context>/basecamp.yaml`. Values are
//! kept in two layers: defaults, and data (persisted plus set). Reads see
//! data over defaults.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};

use crate::application::ports::ConfigHandler;
use crate::domain::config::{insert, keys, lookup, merge_over};
use crate::domain::context::{
    DEFAULT_CONTEXT, generate_context_id, is_valid_context_id, validate_context_name,
};
use crate::domain::paths::{CONFIG_FILE, ProjectPaths};

/// Context-local directories holding generated cluster and cloud credentials.
const GENERATED_DIRS: &[&str] = &[".kube", ".talos", ".omni", ".aws"];

struct State {
    config_root: PathBuf,
    defaults: Mapping,
    data: Mapping,
}

impl State {
    fn effective(&self) -> Mapping {
        let mut merged = self.defaults.clone();
        merge_over(&mut merged, &self.data);
        merged
    }

    fn config_file(&self) -> PathBuf {
        self.config_root.join(CONFIG_FILE)
    }
}

/// Production `ConfigHandler` backed by YAML files.
pub struct YamlConfigHandler {
    project_root: PathBuf,
    state: Mutex<State>,
}

impl YamlConfigHandler {
    #[must_use]
    pub fn new(project_root: &Path) -> Self {
        let config_root = ProjectPaths::new(project_root, DEFAULT_CONTEXT).config_root();
        Self {
            project_root: project_root.to_path_buf(),
            state: Mutex::new(State {
                config_root,
                defaults: Mapping::new(),
                data: Mapping::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context_file(&self) -> PathBuf {
        ProjectPaths::new(&self.project_root, DEFAULT_CONTEXT).context_file()
    }
}

/// Atomic write via temp file then rename, owner-only on unix.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, content)
        .with_context(|| format!("cannot write {}", temp_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("cannot set permissions on {}", temp_path.display()))?;
    }

    std::fs::rename(&temp_path, path).with_context(|| format!("cannot write {}", path.display()))
}

/// The mapping stored at `path`; `None` when the file does not exist.
fn read_persisted(path: &Path) -> Result<Option<Mapping>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
    };
    let persisted: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    match persisted {
        Value::Mapping(persisted) => Ok(Some(persisted)),
        Value::Null => Ok(Some(Mapping::new())),
        _ => anyhow::bail!("{} must contain a mapping", path.display()),
    }
}

impl ConfigHandler for YamlConfigHandler {
    fn use_context(&self, context: &str, config_root: &Path) -> Result<()> {
        validate_context_name(context)?;
        let mut state = self.state();
        state.config_root = config_root.to_path_buf();
        state.data = Mapping::new();
        Ok(())
    }

    fn stored_context(&self) -> Option<String> {
        std::fs::read_to_string(self.context_file())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn persist_context(&self, context: &str) -> Result<()> {
        validate_context_name(context)?;
        write_atomic(&self.context_file(), &format!("{context}\n"))
    }

    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.state().effective(), key).cloned()
    }

    fn child_keys(&self, key: &str) -> Vec<String> {
        lookup(&self.state().effective(), key)
            .and_then(Value::as_mapping)
            .map(|m| m.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        Ok(insert(&mut self.state().data, key, value)?)
    }

    fn set_defaults(&self, defaults: Mapping) -> Result<()> {
        merge_over(&mut self.state().defaults, &defaults);
        Ok(())
    }

    fn persisted(&self, key: &str) -> Option<Value> {
        let path = self.state().config_file();
        match read_persisted(&path) {
            Ok(persisted) => lookup(&persisted?, key).cloned(),
            Err(e) => {
                tracing::debug!(error = %format!("{e:#}"), "persisted config unreadable");
                None
            }
        }
    }

    fn load(&self) -> Result<()> {
        let mut state = self.state();
        let path = state.config_file();
        if let Some(persisted) = read_persisted(&path)? {
            merge_over(&mut state.data, &persisted);
            tracing::debug!(path = %path.display(), "config loaded");
        }
        Ok(())
    }

    /// A new file gets the full effective config. An existing file is only
    /// rewritten with its persisted and set values unless `overwrite`.
    fn save(&self, overwrite: bool) -> Result<()> {
        let state = self.state();
        let path = state.config_file();
        let document = if overwrite || !path.exists() {
            state.effective()
        } else {
            state.data.clone()
        };
        let content = serde_yaml::to_string(&document).context("cannot serialize config")?;
        write_atomic(&path, &content)?;
        tracing::debug!(path = %path.display(), overwrite, "config saved");
        Ok(())
    }

    fn clean(&self) -> Result<()> {
        let config_root = self.state().config_root.clone();
        for dir in GENERATED_DIRS {
            let path = config_root.join(dir);
            match std::fs::remove_dir_all(&path) {
                Err(e) if e.kind() != ErrorKind::NotFound => {
                    return Err(e).with_context(|| format!("cannot remove {}", path.display()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn generate_context_id(&self) -> Result<()> {
        if self
            .get_string(keys::ID)
            .is_some_and(|id| is_valid_context_id(&id))
        {
            return Ok(());
        }
        self.set(keys::ID, Value::String(generate_context_id()))
    }
}
