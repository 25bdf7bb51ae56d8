//! Terraform-backed `Provisioner`.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::Runtime;
use crate::application::ports::{ApplyHook, Provisioner};
use crate::domain::Blueprint;
use crate::domain::config::keys;

/// Applies each blueprint component in its own working directory.
pub struct TerraformProvisioner {
    runtime: Runtime,
}

impl TerraformProvisioner {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    fn enabled(&self) -> bool {
        self.runtime.config.bool_or(keys::TERRAFORM_ENABLED, true)
    }

    fn terraform(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let chdir = format!("-chdir={}", dir.display());
        let mut full = vec![chdir.as_str()];
        full.extend_from_slice(args);
        self.runtime.shell.exec("terraform", &full)
    }
}

impl Provisioner for TerraformProvisioner {
    fn up(&self, blueprint: &Blueprint, on_apply: Option<&ApplyHook>) -> Result<()> {
        if !self.enabled() {
            tracing::debug!("terraform disabled, skipping apply");
            return Ok(());
        }
        let root = self.runtime.paths().terraform_dir();
        for component in &blueprint.terraform {
            let name = component.name();
            let dir = root.join(&component.path);
            tracing::info!(component = name, "applying");
            self.terraform(&dir, &["init", "-input=false", "-upgrade"])
                .with_context(|| format!("terraform init failed for {name}"))?;
            self.terraform(&dir, &["apply", "-input=false", "-auto-approve"])
                .with_context(|| format!("terraform apply failed for {name}"))?;
            if let Some(hook) = on_apply {
                hook(name).with_context(|| format!("post-apply step failed for {name}"))?;
            }
        }
        Ok(())
    }

    fn down(&self, blueprint: &Blueprint) -> Result<()> {
        if !self.enabled() {
            tracing::debug!("terraform disabled, skipping destroy");
            return Ok(());
        }
        let root = self.runtime.paths().terraform_dir();
        for component in blueprint.terraform.iter().rev() {
            let name = component.name();
            let dir = root.join(&component.path);
            if !self.runtime.fs.exists(&dir) {
                tracing::debug!(component = name, "never generated, skipping destroy");
                continue;
            }
            tracing::info!(component = name, "destroying");
            self.terraform(&dir, &["destroy", "-input=false", "-auto-approve"])
                .with_context(|| format!("terraform destroy failed for {name}"))?;
        }
        Ok(())
    }
}
