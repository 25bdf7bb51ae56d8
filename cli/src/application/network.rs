//! Network managers: address assignment plus host, guest, and DNS wiring.
//!
//! All host mutation goes through the [`Shell`] port; privileged steps use
//! `exec_sudo`.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ports::{NetworkManager, Service};
use crate::application::runtime::Runtime;
use crate::domain::WorkstationError;
use crate::domain::config::{DEFAULT_CIDR, DEFAULT_DOMAIN, keys};
use crate::domain::dns::{HostOs, resolver_stanza, validate_domain};
use crate::domain::network::{Cidr, guest_forwarding_script};
use crate::domain::service::{DNS_SERVICE, LOCALSTACK_SERVICE};

/// Interface inside the colima guest that faces the host.
const COLIMA_HOST_INTERFACE: &str = "col0";

// ── Base ──────────────────────────────────────────────────────────────────────

/// Services sit on a bridge the host reaches directly; only DNS needs wiring.
pub struct BaseNetworkManager {
    runtime: Runtime,
    os: HostOs,
}

impl BaseNetworkManager {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            os: HostOs::current(),
        }
    }

    /// Override host OS detection.
    #[must_use]
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    fn cidr(&self) -> Result<Cidr> {
        let raw = self.runtime.config.string_or(keys::NETWORK_CIDR, DEFAULT_CIDR);
        Ok(raw.parse::<Cidr>()?)
    }
}

impl NetworkManager for BaseNetworkManager {
    fn assign_ips(&self, services: &[Arc<dyn Service>]) -> Result<()> {
        let cidr = self.cidr()?;
        let addresses = cidr.allocate(services.len())?;
        for (service, address) in services.iter().zip(addresses) {
            service.set_address(address);
            let key = match service.name() {
                DNS_SERVICE => Some(keys::DNS_ADDRESS),
                LOCALSTACK_SERVICE => Some(keys::LOCALSTACK_ADDRESS),
                _ => None,
            };
            if let Some(key) = key {
                self.runtime.config.set(key, address.to_string().into())?;
            }
            tracing::debug!(service = service.name(), %address, "address assigned");
        }
        Ok(())
    }

    fn configure_guest(&self) -> Result<()> {
        Ok(())
    }

    fn configure_host_route(&self) -> Result<()> {
        Ok(())
    }

    fn configure_dns(&self) -> Result<()> {
        let Some(nameserver) = self.runtime.config.get_string(keys::DNS_ADDRESS) else {
            tracing::debug!("no DNS service address, resolver left unchanged");
            return Ok(());
        };
        let nameserver: Ipv4Addr = nameserver
            .parse()
            .with_context(|| format!("invalid DNS service address {nameserver}"))?;
        let domain = self.runtime.config.string_or(keys::DNS_DOMAIN, DEFAULT_DOMAIN);
        validate_domain(&domain)?;
        let (path, body) = resolver_stanza(self.os, &domain, &nameserver.to_string());

        let current = self
            .runtime
            .fs
            .read_to_string(std::path::Path::new(&path))
            .ok();
        if current.as_deref() == Some(body.as_str()) {
            tracing::debug!(%path, "resolver already configured");
            return Ok(());
        }

        let dir = std::path::Path::new(&path)
            .parent()
            .map_or_else(|| "/etc".to_string(), |p| p.display().to_string());
        let script = format!("mkdir -p '{dir}' && printf '%s' '{body}' > '{path}'");
        self.runtime
            .shell
            .exec_sudo(
                &format!("Configuring host resolver for .{domain}"),
                "sh",
                &["-c", &script],
            )
            .with_context(|| format!("failed to write resolver config {path}"))?;
        if self.os == HostOs::Linux {
            self.runtime
                .shell
                .exec_sudo(
                    "Restarting systemd-resolved",
                    "systemctl",
                    &["restart", "systemd-resolved"],
                )
                .context("failed to restart systemd-resolved")?;
        }
        tracing::info!(%domain, %nameserver, "host resolver configured");
        Ok(())
    }

    fn needs_privilege(&self) -> bool {
        self.runtime.config.bool_or(keys::DNS_ENABLED, false)
    }
}

// ── Colima ────────────────────────────────────────────────────────────────────

/// Services live inside a colima guest: the guest forwards the bridge and the
/// host routes the service network through the guest address.
pub struct ColimaNetworkManager {
    base: BaseNetworkManager,
}

impl ColimaNetworkManager {
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self {
            base: BaseNetworkManager::new(runtime),
        }
    }

    #[must_use]
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.base = self.base.with_os(os);
        self
    }

    fn runtime(&self) -> &Runtime {
        &self.base.runtime
    }
}

impl NetworkManager for ColimaNetworkManager {
    fn assign_ips(&self, services: &[Arc<dyn Service>]) -> Result<()> {
        self.base.assign_ips(services)
    }

    fn configure_guest(&self) -> Result<()> {
        let cidr = self.base.cidr()?;
        let script = guest_forwarding_script(&cidr, COLIMA_HOST_INTERFACE);
        let profile = self.runtime().paths().colima_profile();
        self.runtime()
            .shell
            .exec_silent(
                "colima",
                &["ssh", "--profile", &profile, "--", "sh", "-c", &script],
            )
            .context("failed to configure guest forwarding")?;
        tracing::info!(%cidr, "guest forwarding configured");
        Ok(())
    }

    fn configure_host_route(&self) -> Result<()> {
        let cidr = self.base.cidr()?.to_string();
        let gateway = self
            .runtime()
            .config
            .get_string(keys::VM_ADDRESS)
            .ok_or(WorkstationError::VmAddressMissing)?;
        let shell = &self.runtime().shell;
        match self.base.os {
            HostOs::Macos => {
                let network = self.base.cidr()?.network().to_string();
                let existing = shell
                    .exec_silent("route", &["-n", "get", &network])
                    .unwrap_or_default();
                if existing.contains(&format!("gateway: {gateway}")) {
                    tracing::debug!(%cidr, %gateway, "host route already present");
                    return Ok(());
                }
                if let Err(e) =
                    shell.exec_silent("sudo", &["-n", "route", "-n", "delete", "-net", &cidr])
                {
                    tracing::debug!(%cidr, error = %format!("{e:#}"), "no stale route removed");
                }
                shell.exec_sudo(
                    &format!("Routing {cidr} via {gateway}"),
                    "route",
                    &["-nv", "add", "-net", &cidr, &gateway],
                )
            }
            HostOs::Linux => shell.exec_sudo(
                &format!("Routing {cidr} via {gateway}"),
                "ip",
                &["route", "replace", &cidr, "via", &gateway],
            ),
        }
        .with_context(|| format!("failed to route {cidr} via {gateway}"))?;
        tracing::info!(%cidr, %gateway, "host route configured");
        Ok(())
    }

    fn configure_dns(&self) -> Result<()> {
        self.base.configure_dns()
    }

    fn needs_privilege(&self) -> bool {
        true
    }
}
