//! Blueprint loading and infrastructure artifact generation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::application::Runtime;
use crate::application::ports::Composer;
use crate::domain::Blueprint;
use crate::domain::blueprint::TerraformComponent;
use crate::domain::paths::BLUEPRINT_FILE;

/// Production `Composer`: blueprint YAML from a URL, a local file, or the
/// context's `blueprint.yaml`, falling back to a default blueprint.
pub struct BlueprintComposer {
    runtime: Runtime,
    loaded: Mutex<Option<Blueprint>>,
}

impl BlueprintComposer {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            loaded: Mutex::new(None),
        }
    }

    fn blueprint_path(&self) -> PathBuf {
        self.runtime.config_root.join(BLUEPRINT_FILE)
    }

    fn fetch(url: &str) -> Result<String> {
        match ureq::get(url).set("User-Agent", "basecamp-cli").call() {
            Ok(resp) => resp.into_string().context("reading blueprint response"),
            Err(ureq::Error::Status(code, _)) => {
                anyhow::bail!("Cannot download blueprint {url}: HTTP {code}")
            }
            Err(e) => Err(e).with_context(|| format!("Cannot download blueprint {url}")),
        }
    }

    fn source(&self, url: Option<&str>) -> Result<Option<String>> {
        match url {
            Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
                Self::fetch(url).map(Some)
            }
            Some(path) => self.runtime.fs.read_to_string(Path::new(path)).map(Some),
            None => {
                let path = self.blueprint_path();
                if self.runtime.fs.exists(&path) {
                    self.runtime.fs.read_to_string(&path).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn write_component(&self, component: &TerraformComponent, overwrite: bool) -> Result<()> {
        let dir = self.runtime.paths().terraform_dir().join(&component.path);
        self.runtime.fs.create_dir_all(&dir)?;
        let (file, document) = match &component.source {
            Some(source) => {
                let mut module = serde_json::Map::new();
                module.insert("source".into(), source.clone().into());
                for (key, value) in &component.inputs {
                    if let Some(key) = key.as_str() {
                        module.insert(
                            key.to_string(),
                            serde_json::to_value(value).context("cannot convert module input")?,
                        );
                    }
                }
                let mut modules = serde_json::Map::new();
                modules.insert(component.name().to_string(), module.into());
                let document = serde_json::json!({ "module": modules });
                ("main.tf.json", document)
            }
            None => (
                "terraform.tfvars.json",
                serde_json::to_value(&component.inputs).context("cannot convert inputs")?,
            ),
        };
        let path = dir.join(file);
        if self.runtime.fs.exists(&path) && !overwrite {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&document).context("cannot serialize")?;
        self.runtime.fs.write(&path, &content)
    }
}

impl Composer for BlueprintComposer {
    fn load_blueprint(&self, url: Option<&str>) -> Result<()> {
        let blueprint = match self.source(url)? {
            Some(content) => serde_yaml::from_str::<Blueprint>(&content)
                .context("cannot parse blueprint")?,
            None => Blueprint::default_for(&self.runtime.context_name),
        };
        tracing::debug!(
            name = %blueprint.metadata.name,
            components = blueprint.terraform.len(),
            "blueprint loaded"
        );
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = Some(blueprint);
        Ok(())
    }

    fn blueprint(&self) -> Option<Blueprint> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn generate(&self, overwrite: bool) -> Result<()> {
        let blueprint = self
            .blueprint()
            .ok_or(crate::domain::ProjectError::BlueprintNotLoaded)?;
        let path = self.blueprint_path();
        if overwrite || !self.runtime.fs.exists(&path) {
            let content = serde_yaml::to_string(&blueprint).context("cannot serialize blueprint")?;
            self.runtime.fs.write(&path, &content)?;
        }
        for component in &blueprint.terraform {
            self.write_component(component, overwrite)
                .with_context(|| format!("cannot generate component {}", component.name()))?;
        }
        Ok(())
    }
}
