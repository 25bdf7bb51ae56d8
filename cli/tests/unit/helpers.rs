//! Shared test helpers: recording fakes for every port.
//!
//! All fakes share one [`Recorder`], so a test can assert on the total order
//! of calls across collaborators and inject a failure at any recorded call.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_yaml::{Mapping, Value};

use basecamp_cli::application::Runtime;
use basecamp_cli::application::ports::{
    ApplyHook, ComponentFactory, Composer, ConfigHandler, ContainerRuntime, LocalFs,
    NetworkManager, ProcessEnv, Provisioner, Service, Shell, ToolsManager, VirtualMachine,
};
use basecamp_cli::application::services::{Project, ProjectOverrides, Workstation};
use basecamp_cli::domain::compose::ComposeService;
use basecamp_cli::domain::config::{insert, lookup, merge_over};
use basecamp_cli::domain::{
    Blueprint, NetworkVariant, RuntimeVariant, TerraformComponent, VmVariant,
};

pub const PROJECT_ROOT: &str = "/work/app";
pub const HOME: &str = "/home/dev";

// ── Recorder ─────────────────────────────────────────────────────────────────

/// Ordered call log plus a list of calls that should fail.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Log `call`, failing if it was registered with [`Recorder::fail_on`].
    pub fn record(&self, call: impl Into<String>) -> Result<()> {
        let call = call.into();
        self.calls.lock().expect("calls").push(call.clone());
        if self.failures.lock().expect("failures").contains(&call) {
            anyhow::bail!("{call} failed");
        }
        Ok(())
    }

    /// Log `call` for calls that cannot fail.
    pub fn note(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls").push(call.into());
    }

    pub fn fail_on(&self, call: &str) {
        self.failures.lock().expect("failures").push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("calls").clear();
    }

    pub fn contains(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Position of the first occurrence of `call`.
    pub fn index_of(&self, call: &str) -> usize {
        let calls = self.calls();
        calls
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("{call} not recorded in {calls:#?}"))
    }

    /// Calls starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// Assert that `expected` were recorded in this relative order.
    pub fn assert_order(&self, expected: &[&str]) {
        let positions: Vec<usize> = expected.iter().map(|c| self.index_of(c)).collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "expected order {expected:?}, got {:#?}",
            self.calls()
        );
    }
}

// ── Config ───────────────────────────────────────────────────────────────────

/// In-memory `ConfigHandler`. `persisted` plays the role of the file on disk.
pub struct FakeConfig {
    rec: Recorder,
    defaults: Mutex<Mapping>,
    data: Mutex<Mapping>,
    persisted: Mutex<Mapping>,
    stored: Mutex<Option<String>>,
}

impl FakeConfig {
    pub fn new(rec: Recorder) -> Self {
        Self {
            rec,
            defaults: Mutex::new(Mapping::new()),
            data: Mutex::new(Mapping::new()),
            persisted: Mutex::new(Mapping::new()),
            stored: Mutex::new(None),
        }
    }

    /// Set a value without recording a call.
    pub fn seed(&self, key: &str, value: Value) {
        insert(&mut self.data.lock().expect("data"), key, value).expect("seed");
    }

    /// Put a value in the simulated config file, picked up by `load`.
    pub fn persist(&self, key: &str, value: Value) {
        insert(&mut self.persisted.lock().expect("persisted"), key, value).expect("persist");
    }

    pub fn store_context(&self, context: &str) {
        *self.stored.lock().expect("stored") = Some(context.to_string());
    }

    fn effective(&self) -> Mapping {
        let mut merged = self.defaults.lock().expect("defaults").clone();
        merge_over(&mut merged, &self.data.lock().expect("data"));
        merged
    }
}

impl ConfigHandler for FakeConfig {
    fn use_context(&self, context: &str, _config_root: &Path) -> Result<()> {
        self.rec.record(format!("config.use_context {context}"))
    }

    fn stored_context(&self) -> Option<String> {
        self.stored.lock().expect("stored").clone()
    }

    fn persist_context(&self, context: &str) -> Result<()> {
        self.rec.record(format!("config.persist_context {context}"))?;
        self.store_context(context);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.effective(), key).cloned()
    }

    fn child_keys(&self, key: &str) -> Vec<String> {
        lookup(&self.effective(), key)
            .and_then(Value::as_mapping)
            .map(|m| m.keys().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.rec.record(format!("config.set {key}"))?;
        insert(&mut self.data.lock().expect("data"), key, value)?;
        Ok(())
    }

    fn set_defaults(&self, defaults: Mapping) -> Result<()> {
        self.rec.record("config.set_defaults")?;
        merge_over(&mut self.defaults.lock().expect("defaults"), &defaults);
        Ok(())
    }

    fn persisted(&self, key: &str) -> Option<Value> {
        lookup(&self.persisted.lock().expect("persisted"), key).cloned()
    }

    fn load(&self) -> Result<()> {
        self.rec.record("config.load")?;
        let persisted = self.persisted.lock().expect("persisted").clone();
        merge_over(&mut self.data.lock().expect("data"), &persisted);
        Ok(())
    }

    fn save(&self, overwrite: bool) -> Result<()> {
        self.rec.record(format!("config.save overwrite={overwrite}"))
    }

    fn clean(&self) -> Result<()> {
        self.rec.record("config.clean")
    }

    fn generate_context_id(&self) -> Result<()> {
        self.rec.record("config.generate_context_id")?;
        if self.get_string("id").is_none() {
            self.seed("id", Value::from("bc0123456789abcd"));
        }
        Ok(())
    }
}

// ── Shell ────────────────────────────────────────────────────────────────────

/// Records every command as `<kind> <program> <args...>`, where kind is
/// `exec`, `silent`, or `sudo`.
pub struct RecordingShell {
    rec: Recorder,
    root: PathBuf,
    token: Mutex<String>,
    outputs: Mutex<Vec<(String, String)>>,
}

impl RecordingShell {
    pub fn new(rec: Recorder, root: &Path) -> Self {
        Self {
            rec,
            root: root.to_path_buf(),
            token: Mutex::new("session-1".to_string()),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `stdout` to any command line starting with `prefix`.
    pub fn respond(&self, prefix: &str, stdout: &str) {
        self.outputs
            .lock()
            .expect("outputs")
            .push((prefix.to_string(), stdout.to_string()));
    }

    pub fn set_token(&self, token: &str) {
        *self.token.lock().expect("token") = token.to_string();
    }

    fn run(&self, kind: &str, program: &str, args: &[&str]) -> Result<String> {
        let mut line = format!("{kind} {program}");
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.rec.record(line.clone())?;
        Ok(self
            .outputs
            .lock()
            .expect("outputs")
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

impl Shell for RecordingShell {
    fn exec(&self, program: &str, args: &[&str]) -> Result<String> {
        self.run("exec", program, args)
    }

    fn exec_silent(&self, program: &str, args: &[&str]) -> Result<String> {
        self.run("silent", program, args)
    }

    fn exec_sudo(&self, _message: &str, program: &str, args: &[&str]) -> Result<String> {
        self.run("sudo", program, args)
    }

    fn project_root(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }

    fn session_token(&self) -> Result<String> {
        Ok(self.token.lock().expect("token").clone())
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// In-memory `LocalFs`. Writes and removals are recorded.
pub struct MemFs {
    rec: Recorder,
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemFs {
    pub fn new(rec: Recorder) -> Self {
        Self {
            rec,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn put(&self, path: impl Into<PathBuf>, content: &str) {
        self.files
            .lock()
            .expect("files")
            .insert(path.into(), content.to_string());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().expect("files").get(path.as_ref()).cloned()
    }
}

impl LocalFs for MemFs {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .expect("files")
            .keys()
            .any(|p| p.starts_with(path))
    }

    fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.rec.record(format!("fs.write {}", path.display()))?;
        self.put(path, content);
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.file(path)
            .ok_or_else(|| anyhow::anyhow!("{} not found", path.display()))
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        self.rec.record(format!("fs.remove_all {}", path.display()))?;
        self.files
            .lock()
            .expect("files")
            .retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

// ── Process environment ──────────────────────────────────────────────────────

pub struct RecordingEnv {
    rec: Recorder,
    vars: Mutex<BTreeMap<String, String>>,
}

impl RecordingEnv {
    pub fn new(rec: Recorder) -> Self {
        Self {
            rec,
            vars: Mutex::new(BTreeMap::new()),
        }
    }
}

impl ProcessEnv for RecordingEnv {
    fn set(&self, key: &str, value: &str) {
        self.rec.note(format!("env.set {key}"));
        self.vars
            .lock()
            .expect("vars")
            .insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().expect("vars").get(key).cloned()
    }

    fn vars(&self) -> BTreeMap<String, String> {
        self.vars.lock().expect("vars").clone()
    }
}

// ── Tools ────────────────────────────────────────────────────────────────────

pub struct FakeTools(pub Recorder);

impl ToolsManager for FakeTools {
    fn check(&self) -> Result<()> {
        self.0.record("tools.check")
    }
}

// ── Drivers ──────────────────────────────────────────────────────────────────

pub struct FakeNetwork {
    rec: Recorder,
    pub variant: NetworkVariant,
    needs_privilege: bool,
    assigned: Mutex<Vec<Vec<String>>>,
}

impl FakeNetwork {
    /// Service names passed to each `assign_ips` call.
    pub fn assigned(&self) -> Vec<Vec<String>> {
        self.assigned.lock().expect("assigned").clone()
    }
}

impl NetworkManager for FakeNetwork {
    fn assign_ips(&self, services: &[Arc<dyn Service>]) -> Result<()> {
        self.rec.record("network.assign_ips")?;
        self.assigned
            .lock()
            .expect("assigned")
            .push(services.iter().map(|s| s.name().to_string()).collect());
        for (i, service) in services.iter().enumerate() {
            let host = u8::try_from(i + 2).expect("small service set");
            service.set_address(Ipv4Addr::new(10, 5, 0, host));
        }
        Ok(())
    }

    fn configure_guest(&self) -> Result<()> {
        self.rec.record("network.configure_guest")
    }

    fn configure_host_route(&self) -> Result<()> {
        self.rec.record("network.configure_host_route")
    }

    fn configure_dns(&self) -> Result<()> {
        self.rec.record("network.configure_dns")
    }

    fn needs_privilege(&self) -> bool {
        self.needs_privilege
    }
}

/// A VM whose calls are logged as `<label>.<op>`.
pub struct FakeVm {
    rec: Recorder,
    label: String,
    address_on_up: Mutex<Option<String>>,
    address: Mutex<Option<String>>,
}

impl FakeVm {
    pub fn new(rec: Recorder, label: &str, address_on_up: Option<&str>) -> Self {
        Self {
            rec,
            label: label.to_string(),
            address_on_up: Mutex::new(address_on_up.map(str::to_string)),
            address: Mutex::new(None),
        }
    }

    /// Address reported after the next `up`.
    pub fn set_address_on_up(&self, address: Option<&str>) {
        *self.address_on_up.lock().expect("address_on_up") = address.map(str::to_string);
    }
}

impl VirtualMachine for FakeVm {
    fn write_config(&self) -> Result<()> {
        self.rec.record(format!("{}.write_config", self.label))
    }

    fn up(&self) -> Result<()> {
        self.rec.record(format!("{}.up", self.label))?;
        let address = self.address_on_up.lock().expect("address_on_up").clone();
        *self.address.lock().expect("address") = address;
        Ok(())
    }

    fn down(&self) -> Result<()> {
        self.rec.record(format!("{}.down", self.label))
    }

    fn address(&self) -> Option<String> {
        self.address.lock().expect("address").clone()
    }
}

pub struct FakeRuntime {
    rec: Recorder,
    variant: RuntimeVariant,
    embedded: Option<Arc<dyn VirtualMachine>>,
}

impl ContainerRuntime for FakeRuntime {
    fn variant(&self) -> RuntimeVariant {
        self.variant
    }

    fn write_config(&self) -> Result<()> {
        self.rec.record("runtime.write_config")
    }

    fn up(&self) -> Result<()> {
        self.rec.record("runtime.up")
    }

    fn down(&self) -> Result<()> {
        self.rec.record("runtime.down")
    }

    fn embedded_vm(&self) -> Option<Arc<dyn VirtualMachine>> {
        self.embedded.clone()
    }
}

// ── Blueprint and provisioning ───────────────────────────────────────────────

pub struct FakeComposer {
    rec: Recorder,
    source: Blueprint,
    loaded: Arc<Mutex<Option<Blueprint>>>,
}

impl Composer for FakeComposer {
    fn load_blueprint(&self, url: Option<&str>) -> Result<()> {
        self.rec
            .record(format!("composer.load_blueprint {}", url.unwrap_or("default")))?;
        *self.loaded.lock().expect("loaded") = Some(self.source.clone());
        Ok(())
    }

    fn blueprint(&self) -> Option<Blueprint> {
        self.loaded.lock().expect("loaded").clone()
    }

    fn generate(&self, overwrite: bool) -> Result<()> {
        self.rec
            .record(format!("composer.generate overwrite={overwrite}"))
    }
}

/// Applies components in order, calling the hook after each.
pub struct FakeProvisioner(pub Recorder);

impl Provisioner for FakeProvisioner {
    fn up(&self, blueprint: &Blueprint, on_apply: Option<&ApplyHook>) -> Result<()> {
        self.0
            .record(format!("provisioner.up hook={}", on_apply.is_some()))?;
        for component in &blueprint.terraform {
            self.0
                .record(format!("provisioner.apply {}", component.name()))?;
            if let Some(hook) = on_apply {
                hook(component.name())?;
            }
        }
        Ok(())
    }

    fn down(&self, _blueprint: &Blueprint) -> Result<()> {
        self.0.record("provisioner.down")
    }
}

// ── Services ─────────────────────────────────────────────────────────────────

/// A compose-less service whose config write is recorded.
pub struct FakeService {
    rec: Recorder,
    name: String,
    address: Mutex<Option<Ipv4Addr>>,
}

impl FakeService {
    pub fn shared(rec: &Recorder, name: &str) -> Arc<dyn Service> {
        Arc::new(Self {
            rec: rec.clone(),
            name: name.to_string(),
            address: Mutex::new(None),
        })
    }
}

impl Service for FakeService {
    fn name(&self) -> &str {
        &self.name
    }

    fn hostname(&self) -> String {
        format!("{}.test", self.name)
    }

    fn address(&self) -> Option<Ipv4Addr> {
        *self.address.lock().expect("address")
    }

    fn set_address(&self, address: Ipv4Addr) {
        *self.address.lock().expect("address") = Some(address);
    }

    fn write_config(&self) -> Result<()> {
        self.rec.record(format!("service.{}.write_config", self.name))
    }

    fn compose_service(&self) -> Option<ComposeService> {
        None
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Builds fakes and records which variants were requested.
///
/// Standalone VMs are labelled `vm`; the incus runtime's embedded VM is
/// labelled `incus-vm` and is the same instance every time.
pub struct FakeFactory {
    rec: Recorder,
    needs_privilege: AtomicBool,
    vm_address: Mutex<Option<String>>,
    blueprint: Mutex<Blueprint>,
    loaded: Arc<Mutex<Option<Blueprint>>>,
    networks: Mutex<Vec<Arc<FakeNetwork>>>,
    pub incus_vm: Arc<FakeVm>,
}

impl FakeFactory {
    pub fn new(rec: Recorder) -> Self {
        Self {
            incus_vm: Arc::new(FakeVm::new(rec.clone(), "incus-vm", Some("192.168.106.2"))),
            rec,
            needs_privilege: AtomicBool::new(false),
            vm_address: Mutex::new(Some("192.168.106.2".to_string())),
            blueprint: Mutex::new(Blueprint::default_for("local")),
            loaded: Arc::new(Mutex::new(None)),
            networks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_needs_privilege(&self, needs: bool) {
        self.needs_privilege.store(needs, Ordering::SeqCst);
    }

    /// Address standalone VMs built after this call report once up.
    pub fn set_vm_address(&self, address: Option<&str>) {
        *self.vm_address.lock().expect("vm_address") = address.map(str::to_string);
    }

    /// Blueprint that composers built after this call load.
    pub fn set_blueprint(&self, blueprint: Blueprint) {
        *self.blueprint.lock().expect("blueprint") = blueprint;
    }

    /// The most recently built network manager.
    pub fn network(&self) -> Arc<FakeNetwork> {
        Arc::clone(
            self.networks
                .lock()
                .expect("networks")
                .last()
                .expect("a network manager was built"),
        )
    }
}

impl ComponentFactory for FakeFactory {
    fn network_manager(
        &self,
        variant: NetworkVariant,
        _runtime: &Runtime,
    ) -> Arc<dyn NetworkManager> {
        self.rec
            .note(format!("factory.network_manager {variant:?}"));
        let network = Arc::new(FakeNetwork {
            rec: self.rec.clone(),
            variant,
            needs_privilege: self.needs_privilege.load(Ordering::SeqCst),
            assigned: Mutex::new(Vec::new()),
        });
        self.networks
            .lock()
            .expect("networks")
            .push(Arc::clone(&network));
        network
    }

    fn virtual_machine(&self, variant: VmVariant, _runtime: &Runtime) -> Arc<dyn VirtualMachine> {
        self.rec
            .note(format!("factory.virtual_machine {variant:?}"));
        let address = self.vm_address.lock().expect("vm_address").clone();
        Arc::new(FakeVm::new(self.rec.clone(), "vm", address.as_deref()))
    }

    fn container_runtime(
        &self,
        variant: RuntimeVariant,
        _runtime: &Runtime,
        services: &[Arc<dyn Service>],
    ) -> Box<dyn ContainerRuntime> {
        self.rec.note(format!(
            "factory.container_runtime {variant:?} services={}",
            services.len()
        ));
        let embedded: Option<Arc<dyn VirtualMachine>> = match variant {
            RuntimeVariant::Incus => Some(self.incus_vm.clone()),
            RuntimeVariant::Docker => None,
        };
        Box::new(FakeRuntime {
            rec: self.rec.clone(),
            variant,
            embedded,
        })
    }

    fn composer(&self, _runtime: &Runtime) -> Box<dyn Composer> {
        Box::new(FakeComposer {
            rec: self.rec.clone(),
            source: self.blueprint.lock().expect("blueprint").clone(),
            loaded: Arc::clone(&self.loaded),
        })
    }

    fn provisioner(&self, _runtime: &Runtime) -> Box<dyn Provisioner> {
        Box::new(FakeProvisioner(self.rec.clone()))
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

/// Every fake wired into one runtime rooted at [`PROJECT_ROOT`].
pub struct Harness {
    pub rec: Recorder,
    pub config: Arc<FakeConfig>,
    pub shell: Arc<RecordingShell>,
    pub fs: Arc<MemFs>,
    pub env: Arc<RecordingEnv>,
    pub factory: Arc<FakeFactory>,
}

impl Harness {
    pub fn new() -> Self {
        let rec = Recorder::default();
        Self {
            config: Arc::new(FakeConfig::new(rec.clone())),
            shell: Arc::new(RecordingShell::new(rec.clone(), Path::new(PROJECT_ROOT))),
            fs: Arc::new(MemFs::new(rec.clone())),
            env: Arc::new(RecordingEnv::new(rec.clone())),
            factory: Arc::new(FakeFactory::new(rec.clone())),
            rec,
        }
    }

    /// Seed a config value.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> &Self {
        self.config.seed(key, value.into());
        self
    }

    pub fn runtime_with_fs(&self, fs: Arc<dyn LocalFs>, root: &Path) -> Runtime {
        Runtime::builder()
            .config(self.config.clone())
            .shell(self.shell.clone())
            .fs(fs)
            .env(self.env.clone())
            .tools(Arc::new(FakeTools(self.rec.clone())))
            .project_root(root)
            .home_dir(Some(PathBuf::from(HOME)))
            .build()
            .expect("runtime")
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime_with_fs(self.fs.clone(), Path::new(PROJECT_ROOT))
    }

    pub fn workstation(&self) -> Workstation {
        Workstation::new(self.runtime(), self.factory.clone())
    }

    pub fn try_project(&self, context: Option<&str>) -> Result<Project> {
        Project::new(
            self.runtime(),
            context,
            self.factory.clone(),
            ProjectOverrides::default(),
        )
    }

    pub fn project(&self, context: Option<&str>) -> Project {
        self.try_project(context).expect("project")
    }
}

/// A blueprint whose components are named after the given paths.
pub fn blueprint(components: &[&str]) -> Blueprint {
    Blueprint {
        terraform: components
            .iter()
            .map(|name| TerraformComponent {
                name: None,
                path: format!("infra/{name}"),
                source: None,
                inputs: Mapping::new(),
            })
            .collect(),
        ..Blueprint::default_for("local")
    }
}

/// Full error chain, outermost first.
pub fn chain(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
