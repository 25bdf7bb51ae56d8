//! Concrete workstation services and service-set construction.
//!
//! Services only render configuration: the DNS service writes its Corefile,
//! every service contributes a compose fragment. Starting them is the
//! container runtime's job.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use anyhow::{Context, Result};

use crate::application::ports::{LocalFs, Service};
use crate::application::runtime::Runtime;
use crate::domain::compose::ComposeService;
use crate::domain::config::{DEFAULT_DOMAIN, PROVIDER_GENERIC, keys};
use crate::domain::dns::render_corefile;
use crate::domain::service::{NodeRole, ServiceKind, ServicePlanInput, ServiceSpec, plan_services};

const COREDNS_IMAGE: &str = "coredns/coredns:1.11.3";
const GIT_LIVERELOAD_IMAGE: &str = "ghcr.io/windsorcli/git-livereload-server:v0.2.1";
const LOCALSTACK_IMAGE: &str = "localstack/localstack:3.8.1";
const REGISTRY_IMAGE: &str = "registry:2.8.3";
const TALOS_IMAGE: &str = "ghcr.io/siderolabs/talos:v1.8.3";

// ── Shared identity ───────────────────────────────────────────────────────────

/// Name, hostname, and assigned address every service carries.
struct Identity {
    name: String,
    domain: String,
    address: Mutex<Option<Ipv4Addr>>,
}

impl Identity {
    fn new(name: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            address: Mutex::new(None),
        }
    }

    fn hostname(&self) -> String {
        format!("{}.{}", self.name, self.domain)
    }

    fn address(&self) -> Option<Ipv4Addr> {
        *self.address.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_address(&self, address: Ipv4Addr) {
        *self.address.lock().unwrap_or_else(PoisonError::into_inner) = Some(address);
    }

    fn compose(&self, image: &str) -> ComposeService {
        ComposeService {
            image: image.to_string(),
            container_name: Some(format!("basecamp-{}", self.name)),
            hostname: Some(self.hostname()),
            restart: "always".to_string(),
            ..ComposeService::default()
        }
    }
}

macro_rules! delegate_identity {
    () => {
        fn name(&self) -> &str {
            &self.id.name
        }

        fn hostname(&self) -> String {
            self.id.hostname()
        }

        fn address(&self) -> Option<Ipv4Addr> {
            self.id.address()
        }

        fn set_address(&self, address: Ipv4Addr) {
            self.id.set_address(address);
        }
    };
}

// ── DNS ───────────────────────────────────────────────────────────────────────

/// CoreDNS answering the project domain for every peer service.
pub struct DnsService {
    id: Identity,
    fs: Arc<dyn LocalFs>,
    corefile: std::path::PathBuf,
    peers: Mutex<Vec<Weak<dyn Service>>>,
}

impl DnsService {
    fn new(runtime: &Runtime, domain: &str) -> Self {
        Self {
            id: Identity::new(crate::domain::service::DNS_SERVICE, domain),
            fs: Arc::clone(&runtime.fs),
            corefile: runtime.paths().corefile(),
            peers: Mutex::new(Vec::new()),
        }
    }
}

impl Service for DnsService {
    delegate_identity!();

    fn write_config(&self) -> Result<()> {
        let hosts: Vec<(String, String)> = self
            .peers()
            .iter()
            .filter_map(|peer| Some((peer.hostname(), peer.address()?.to_string())))
            .collect();
        let corefile = render_corefile(&self.id.domain, &hosts);
        self.fs
            .write(&self.corefile, &corefile)
            .with_context(|| format!("failed to write {}", self.corefile.display()))
    }

    fn compose_service(&self) -> Option<ComposeService> {
        let mut service = self.id.compose(COREDNS_IMAGE);
        service.command = vec!["-conf".to_string(), "/etc/coredns/Corefile".to_string()];
        service.volumes = vec![format!("{}:/etc/coredns/Corefile", self.corefile.display())];
        Some(service)
    }

    fn set_peers(&self, peers: &[Arc<dyn Service>]) {
        *self.peers.lock().unwrap_or_else(PoisonError::into_inner) =
            peers.iter().map(Arc::downgrade).collect();
    }

    fn peers(&self) -> Vec<Arc<dyn Service>> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

// ── Compose-only workloads ────────────────────────────────────────────────────

/// A service whose whole configuration is its compose fragment.
pub struct ContainerService {
    id: Identity,
    fragment: ComposeService,
}

impl ContainerService {
    fn new(id: Identity, configure: impl FnOnce(&Identity, &mut ComposeService)) -> Self {
        let mut fragment = id.compose("");
        configure(&id, &mut fragment);
        Self { id, fragment }
    }
}

impl Service for ContainerService {
    delegate_identity!();

    fn write_config(&self) -> Result<()> {
        Ok(())
    }

    fn compose_service(&self) -> Option<ComposeService> {
        Some(self.fragment.clone())
    }
}

fn git_livereload(runtime: &Runtime, id: Identity) -> ContainerService {
    let image = runtime
        .config
        .string_or(keys::GIT_LIVERELOAD_IMAGE, GIT_LIVERELOAD_IMAGE);
    let project = runtime
        .project_root
        .file_name()
        .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned());
    let root = runtime.project_root.display().to_string();
    ContainerService::new(id, |_, svc| {
        svc.image = image;
        svc.volumes = vec![format!("{root}:/repos/mount/{project}:ro")];
        svc.environment.insert("RSYNC_PROTECT".into(), ".basecamp,.volumes".into());
    })
}

fn localstack(runtime: &Runtime, id: Identity) -> ContainerService {
    let services = runtime.config.get_string(keys::LOCALSTACK_SERVICES);
    ContainerService::new(id, |_, svc| {
        svc.image = LOCALSTACK_IMAGE.to_string();
        svc.environment.insert("PERSISTENCE".into(), "1".into());
        if let Some(services) = services {
            svc.environment.insert("SERVICES".into(), services);
        }
    })
}

fn registry(runtime: &Runtime, id: Identity) -> ContainerService {
    // Registry keys are hostnames, so they cannot go through a dotted lookup.
    let remote = runtime
        .config
        .get(keys::DOCKER_REGISTRIES)
        .and_then(|registries| {
            registries
                .get(id.name.as_str())?
                .get("remote")?
                .as_str()
                .map(str::to_string)
        });
    ContainerService::new(id, |_, svc| {
        svc.image = REGISTRY_IMAGE.to_string();
        if let Some(remote) = remote {
            svc.environment.insert("REGISTRY_PROXY_REMOTEURL".into(), remote);
        }
    })
}

fn cluster_node(runtime: &Runtime, id: Identity, role: NodeRole) -> ContainerService {
    let volumes = runtime.paths().volumes_dir();
    ContainerService::new(id, |id, svc| {
        svc.image = TALOS_IMAGE.to_string();
        svc.privileged = true;
        svc.environment.insert("PLATFORM".into(), "container".into());
        svc.environment.insert("TALOSSKU".into(), role.as_str().into());
        svc.volumes = vec![
            format!("{}/{}/var:/var", volumes.display(), id.name),
            format!("{}/{}/system:/system/state", volumes.display(), id.name),
        ];
    })
}

// ── Construction ──────────────────────────────────────────────────────────────

fn plan_input(runtime: &Runtime) -> ServicePlanInput {
    let config = &runtime.config;
    let count = |key: &str| {
        config
            .get_int(key)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    ServicePlanInput {
        docker_enabled: config.bool_or(keys::DOCKER_ENABLED, false),
        dns_enabled: config.bool_or(keys::DNS_ENABLED, false),
        git_livereload_enabled: config.bool_or(keys::GIT_LIVERELOAD_ENABLED, false),
        localstack_enabled: config.bool_or(keys::LOCALSTACK_ENABLED, false),
        registries: config.child_keys(keys::DOCKER_REGISTRIES),
        provider: config.string_or(keys::PROVIDER, PROVIDER_GENERIC),
        cluster_driver: config.string_or(keys::CLUSTER_DRIVER, ""),
        controlplanes: count(keys::CONTROLPLANES_COUNT),
        workers: count(keys::WORKERS_COUNT),
    }
}

/// Build the service set from config, in plan order.
///
/// When a DNS service is present it receives the complete list after every
/// other service exists.
#[must_use]
pub fn build_service_set(runtime: &Runtime) -> Vec<Arc<dyn Service>> {
    let domain = runtime.config.string_or(keys::DNS_DOMAIN, DEFAULT_DOMAIN);
    let mut dns: Option<Arc<DnsService>> = None;
    let services: Vec<Arc<dyn Service>> = plan_services(&plan_input(runtime))
        .into_iter()
        .map(|ServiceSpec { name, kind }| -> Arc<dyn Service> {
            let id = Identity::new(&name, &domain);
            match kind {
                ServiceKind::Dns => {
                    let service = Arc::new(DnsService::new(runtime, &domain));
                    dns = Some(Arc::clone(&service));
                    service
                }
                ServiceKind::GitLivereload => Arc::new(git_livereload(runtime, id)),
                ServiceKind::Localstack => Arc::new(localstack(runtime, id)),
                ServiceKind::Registry => Arc::new(registry(runtime, id)),
                ServiceKind::ClusterNode { role } => Arc::new(cluster_node(runtime, id, role)),
            }
        })
        .collect();

    if let Some(dns) = dns {
        dns.set_peers(&services);
    }
    tracing::debug!(
        services = ?services.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
        "service set built"
    );
    services
}
