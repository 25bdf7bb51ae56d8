//! Application service: project bring-up and tear-down.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! A [`Project`] sequences config, blueprint, workstation, and provisioner;
//! every stage fails fast with a stage-specific message.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_yaml::Value;

use crate::application::ports::{ComponentFactory, Composer, Provisioner};
use crate::application::runtime::Runtime;
use crate::application::services::workstation::Workstation;
use crate::domain::config::{
    ProviderInputs, default_config, default_provider, is_dev_context, keys, merge_over,
    override_for,
    overrides_mapping, provider_defaults, workstation_active,
};
use crate::domain::context::{resolve_context, validate_context_name};
use crate::domain::{Blueprint, ConfigOverride, ProjectError};

/// Collaborators a caller may supply instead of the factory-built ones.
#[derive(Default)]
pub struct ProjectOverrides {
    pub composer: Option<Box<dyn Composer>>,
    pub provisioner: Option<Box<dyn Provisioner>>,
}

/// Options for [`Project::down`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DownOptions {
    /// Leave provisioned infrastructure in place.
    pub skip_infra: bool,
    /// Remove generated artifacts after stopping.
    pub clean: bool,
}

pub struct Project {
    runtime: Runtime,
    factory: Arc<dyn ComponentFactory>,
    composer: Box<dyn Composer>,
    provisioner: Box<dyn Provisioner>,
    workstation: Option<Workstation>,
}

impl Project {
    /// Resolve the context and assemble the project's collaborators.
    ///
    /// The context is the explicit name, else the stored one, else `local`.
    ///
    /// # Errors
    ///
    /// Returns an error if the context name is invalid or the config handler
    /// cannot switch to it.
    pub fn new(
        mut runtime: Runtime,
        context: Option<&str>,
        factory: Arc<dyn ComponentFactory>,
        overrides: ProjectOverrides,
    ) -> Result<Self> {
        let stored = runtime.config.stored_context();
        let context = resolve_context(context, stored.as_deref());
        validate_context_name(&context)?;
        runtime.set_context(&context);
        runtime
            .config
            .use_context(&context, &runtime.config_root)
            .with_context(|| format!("failed to switch to context {context}"))?;
        tracing::debug!(%context, config_root = %runtime.config_root.display(), "project context resolved");

        let composer = overrides
            .composer
            .unwrap_or_else(|| factory.composer(&runtime));
        let provisioner = overrides
            .provisioner
            .unwrap_or_else(|| factory.provisioner(&runtime));

        let mut project = Self {
            runtime,
            factory,
            composer,
            provisioner,
            workstation: None,
        };
        project.sync_workstation();
        Ok(project)
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn context_name(&self) -> &str {
        &self.runtime.context_name
    }

    #[must_use]
    pub fn workstation(&self) -> Option<&Workstation> {
        self.workstation.as_ref()
    }

    pub fn workstation_mut(&mut self) -> Option<&mut Workstation> {
        self.workstation.as_mut()
    }

    fn dev_mode(&self) -> bool {
        self.runtime.config.is_dev_mode(&self.runtime.context_name)
    }

    /// Attach or detach the workstation to match current config.
    pub fn sync_workstation(&mut self) {
        let active = workstation_active(
            self.dev_mode(),
            self.runtime.config.get_bool(keys::WORKSTATION_ENABLED),
        );
        match (active, self.workstation.is_some()) {
            (true, false) => {
                tracing::debug!("workstation attached");
                self.workstation = Some(Workstation::new(
                    self.runtime.clone(),
                    Arc::clone(&self.factory),
                ));
            }
            (false, true) => {
                tracing::debug!("workstation detached");
                self.workstation = None;
            }
            _ => {}
        }
    }

    /// Layer defaults, persisted config, and flag overrides.
    ///
    /// # Errors
    ///
    /// Fails on the first stage that fails; an override failure names its key.
    pub fn configure(&mut self, overrides: &[ConfigOverride]) -> Result<()> {
        let config = Arc::clone(&self.runtime.config);
        // Persisted values are read directly because `load` only runs after
        // the provider decision.
        let dev_mode = override_for(overrides, keys::DEV)
            .and_then(Value::as_bool)
            .or_else(|| config.get_bool(keys::DEV))
            .or_else(|| config.persisted(keys::DEV).as_ref().and_then(Value::as_bool))
            .unwrap_or_else(|| is_dev_context(&self.runtime.context_name));

        let stored = |key: &str| -> Option<String> {
            config
                .get_string(key)
                .or_else(|| config.persisted(key)?.as_str().map(str::to_string))
        };
        let effective = |key: &str| -> Option<String> {
            override_for(overrides, key)
                .and_then(|v| v.as_str().map(str::to_string))
                .or_else(|| stored(key))
        };
        let current_provider = stored(keys::PROVIDER);
        let vm_driver = effective(keys::VM_DRIVER);
        let vm_runtime = effective(keys::VM_RUNTIME);
        let provider_overridden = override_for(overrides, keys::PROVIDER).is_some();
        if let Some(provider) = default_provider(&ProviderInputs {
            dev_mode,
            provider_overridden,
            current_provider: current_provider.as_deref(),
            vm_driver: vm_driver.as_deref(),
            vm_runtime: vm_runtime.as_deref(),
        }) {
            tracing::debug!(provider, "defaulting provider");
            config
                .set(keys::PROVIDER, provider.into())
                .context("failed to set default provider")?;
        }

        let mut defaults = default_config(dev_mode);
        let flags = overrides_mapping(overrides).context("failed to apply config defaults")?;
        merge_over(&mut defaults, &flags);
        config
            .set_defaults(defaults)
            .context("failed to apply config defaults")?;

        if let Some(provider) = effective(keys::PROVIDER) {
            config
                .set_defaults(provider_defaults(&provider))
                .context("failed to apply provider defaults")?;
        }

        config.load().context("failed to load config")?;

        for o in overrides {
            config
                .set(&o.key, o.value.clone())
                .with_context(|| format!("failed to set {}", o.key))?;
        }

        self.runtime
            .load_environment(false)
            .context("failed to load environment")?;
        self.sync_workstation();
        tracing::info!(context = %self.runtime.context_name, dev_mode, "project configured");
        Ok(())
    }

    /// Prepare the workstation and generate everything `up` needs.
    ///
    /// # Errors
    ///
    /// Strictly sequential; the first failing stage is returned.
    pub fn initialize(&mut self, overwrite: bool, blueprint_url: Option<&str>) -> Result<()> {
        if let Some(workstation) = &mut self.workstation {
            workstation
                .prepare()
                .context("failed to prepare workstation")?;
            if let Some(rt) = workstation.container_runtime() {
                rt.write_config()
                    .context("failed to write container runtime config")?;
            }
        }

        let config = &self.runtime.config;
        config
            .generate_context_id()
            .context("failed to generate context id")?;
        self.composer
            .load_blueprint(blueprint_url)
            .context("failed to load blueprint")?;
        config.save(overwrite).context("failed to save config")?;
        self.composer
            .generate(overwrite)
            .context("failed to generate infrastructure artifacts")?;
        self.runtime
            .tools
            .check()
            .context("failed to check required tools")?;
        self.runtime
            .load_environment(true)
            .context("failed to load environment")?;
        tracing::info!(context = %self.runtime.context_name, "project initialized");
        Ok(())
    }

    /// Bring the workstation up and apply infrastructure.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::BlueprintNotLoaded`] before `initialize`, a
    /// privilege error before any side effect, or the first failing stage.
    pub fn up(&mut self) -> Result<Blueprint> {
        let blueprint = self
            .composer
            .blueprint()
            .ok_or(ProjectError::BlueprintNotLoaded)?;

        if let Some(workstation) = &mut self.workstation {
            if workstation.network().is_none() {
                workstation
                    .prepare()
                    .context("failed to prepare workstation")?;
            }
            workstation.prepare_for_up(Some(&blueprint));
            workstation.ensure_network_privilege()?;
            workstation
                .up(self.runtime.env.as_ref())
                .context("failed to start workstation")?;
        }

        let hook = self
            .workstation
            .as_ref()
            .and_then(Workstation::make_apply_hook);
        self.provisioner
            .up(&blueprint, hook.as_ref())
            .context("failed to apply infrastructure")?;
        tracing::info!(blueprint = %blueprint.metadata.name, "project up");
        Ok(blueprint)
    }

    /// Destroy infrastructure, stop the workstation, optionally clean up.
    ///
    /// # Errors
    ///
    /// Fails fast; partial teardown is left for a retry.
    pub fn down(&mut self, options: DownOptions) -> Result<()> {
        if !options.skip_infra {
            if self.composer.blueprint().is_none() {
                self.composer
                    .load_blueprint(None)
                    .context("failed to load blueprint")?;
            }
            if let Some(blueprint) = self.composer.blueprint() {
                self.provisioner
                    .down(&blueprint)
                    .context("failed to destroy infrastructure")?;
            }
        }

        if let Some(workstation) = &mut self.workstation {
            if workstation.network().is_none() {
                workstation
                    .prepare()
                    .context("failed to prepare workstation")?;
            }
            workstation.down().context("failed to stop workstation")?;
        }

        if options.clean {
            self.perform_cleanup()?;
        }
        tracing::info!(context = %self.runtime.context_name, "project down");
        Ok(())
    }

    /// Clean context config, then remove generated artifacts.
    ///
    /// # Errors
    ///
    /// Absent paths are fine; any other removal failure aborts, naming the
    /// path.
    pub fn perform_cleanup(&self) -> Result<()> {
        self.runtime
            .config
            .clean()
            .context("failed to clean context config")?;
        for path in self.runtime.paths().cleanup_targets() {
            self.runtime
                .fs
                .remove_all(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            tracing::debug!(path = %path.display(), "removed");
        }
        Ok(())
    }
}
