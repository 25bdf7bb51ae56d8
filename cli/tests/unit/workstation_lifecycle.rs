//! Workstation prepare/up/down ordering and branching.

use std::sync::Arc;

use basecamp_cli::application::ports::{ProcessEnv, VirtualMachine};
use basecamp_cli::domain::environment::NO_CACHE_VAR;
use basecamp_cli::domain::{PrivilegeError, RuntimeVariant, WorkstationError};

use crate::helpers::{FakeService, Harness, blueprint, chain};

/// Docker + DNS on a colima VM, generic provider.
fn colima_harness() -> Harness {
    let h = Harness::new();
    h.set("vm.driver", "colima")
        .set("provider", "generic")
        .set("docker.enabled", true)
        .set("dns.enabled", true);
    h
}

// ============================================================================
// prepare
// ============================================================================

#[test]
fn test_docker_disabled_builds_no_services_and_skips_assign_ips() {
    let h = Harness::new();
    h.set("docker.enabled", false)
        .set("dns.enabled", true)
        .set("cluster.driver", "talos")
        .set("cluster.controlplanes.count", 2);
    let mut ws = h.workstation();

    ws.prepare().expect("prepare");

    assert!(ws.services().is_empty());
    assert!(!h.rec.contains("network.assign_ips"));
    assert!(ws.network().is_some());
    assert!(ws.container_runtime().is_none());
    assert!(ws.virtual_machine().is_none());
}

#[test]
fn test_assign_ips_runs_once_with_final_service_order() {
    let h = Harness::new();
    h.set("docker.enabled", true)
        .set("dns.enabled", true)
        .set("provider", "generic")
        .set("cluster.driver", "talos")
        .set("cluster.controlplanes.count", 2)
        .set("cluster.workers.count", 1);
    let mut ws = h.workstation();

    ws.prepare().expect("prepare");

    assert_eq!(h.rec.count("network.assign_ips"), 1);
    assert_eq!(
        h.factory.network().assigned(),
        vec![vec!["dns", "controlplane-1", "controlplane-2", "worker-1"]]
    );
    let dns = &ws.services()[0];
    assert_eq!(dns.name(), "dns");
    assert_eq!(dns.peers().len(), 4);
}

#[test]
fn test_assign_ips_runs_for_empty_set_when_docker_enabled() {
    let h = Harness::new();
    h.set("docker.enabled", true)
        .set("dns.enabled", false)
        .set("git.livereload.enabled", false)
        .set("provider", "generic");
    let mut ws = h.workstation();

    ws.prepare().expect("prepare");

    assert!(ws.services().is_empty());
    assert_eq!(h.rec.count("network.assign_ips"), 1);
    assert_eq!(h.factory.network().assigned(), vec![Vec::<String>::new()]);
}

#[test]
fn test_supplied_services_get_no_addresses_when_docker_disabled() {
    let h = Harness::new();
    h.set("docker.enabled", false);
    let mut ws = h
        .workstation()
        .with_services(vec![FakeService::shared(&h.rec, "only")]);

    ws.prepare().expect("prepare");

    assert!(!h.rec.contains("network.assign_ips"));
    assert!(ws.services()[0].address().is_none());
}

#[test]
fn test_prepare_returns_assign_error_unchanged() {
    let h = Harness::new();
    h.set("docker.enabled", true).set("dns.enabled", true);
    h.rec.fail_on("network.assign_ips");
    let mut ws = h.workstation();

    let err = ws.prepare().expect_err("assign fails");

    assert_eq!(chain(&err), "network.assign_ips failed");
    assert!(!h.rec.contains("factory.container_runtime Docker services=1"));
}

#[test]
fn test_prepare_keeps_supplied_services() {
    let h = Harness::new();
    h.set("docker.enabled", true).set("dns.enabled", true);
    let mut ws = h
        .workstation()
        .with_services(vec![FakeService::shared(&h.rec, "only")]);

    ws.prepare().expect("prepare");

    assert_eq!(h.factory.network().assigned(), vec![vec!["only"]]);
    assert!(h.rec.contains("factory.container_runtime Docker services=1"));
}

#[test]
fn test_colima_driver_selects_colima_network_and_vm() {
    let h = colima_harness();
    let mut ws = h.workstation();

    ws.prepare().expect("prepare");

    h.rec.assert_order(&[
        "factory.network_manager Colima",
        "network.assign_ips",
        "factory.virtual_machine Colima",
        "factory.container_runtime Docker services=1",
    ]);
    assert!(ws.virtual_machine().is_some());
    assert_eq!(
        ws.container_runtime().map(|rt| rt.variant()),
        Some(RuntimeVariant::Docker)
    );
}

#[test]
fn test_incus_runtime_vm_overrides_standalone_vm() {
    let h = Harness::new();
    h.set("vm.driver", "colima").set("provider", "incus");
    let mut ws = h.workstation();

    ws.prepare().expect("prepare");

    assert_eq!(
        ws.container_runtime().map(|rt| rt.variant()),
        Some(RuntimeVariant::Incus)
    );
    let embedded: Arc<dyn VirtualMachine> = h.factory.incus_vm.clone();
    let vm = ws.virtual_machine().expect("vm");
    assert!(Arc::ptr_eq(vm, &embedded));
}

// ============================================================================
// up
// ============================================================================

#[test]
fn test_up_runs_steps_in_dependency_order() {
    let h = colima_harness();
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    ws.prepare_for_up(None);

    ws.up(h.env.as_ref()).expect("up");

    h.rec.assert_order(&[
        "network.assign_ips",
        "env.set BASECAMP_NO_CACHE",
        "vm.write_config",
        "vm.up",
        "fs.write /work/app/.basecamp/Corefile",
        "runtime.write_config",
        "runtime.up",
        "network.configure_guest",
        "network.configure_host_route",
        "network.configure_dns",
    ]);
    assert_eq!(h.env.get(NO_CACHE_VAR).as_deref(), Some("true"));
}

#[test]
fn test_dns_renders_every_peer_before_up_finishes() {
    let h = Harness::new();
    h.set("docker.enabled", true)
        .set("dns.enabled", true)
        .set("provider", "generic")
        .set("cluster.driver", "talos")
        .set("cluster.controlplanes.count", 2)
        .set("cluster.workers.count", 1);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.up(h.env.as_ref()).expect("up");

    let corefile = h
        .fs
        .file("/work/app/.basecamp/Corefile")
        .expect("corefile written");
    for (address, host) in [
        ("10.5.0.2", "dns.test"),
        ("10.5.0.3", "controlplane-1.test"),
        ("10.5.0.4", "controlplane-2.test"),
        ("10.5.0.5", "worker-1.test"),
    ] {
        assert!(corefile.contains(&format!("{address} {host}")), "{corefile}");
    }
}

#[test]
fn test_up_without_vm_fails_for_colima_driver() {
    let h = colima_harness();
    let ws = h.workstation();

    let err = ws.up(h.env.as_ref()).expect_err("no vm");

    assert!(matches!(
        err.downcast_ref::<WorkstationError>(),
        Some(WorkstationError::NoVirtualMachine)
    ));
    assert_eq!(chain(&err), "no virtual machine found");
}

#[test]
fn test_incus_requires_vm_address_after_up() {
    let h = Harness::new();
    h.set("vm.driver", "colima").set("provider", "incus");
    h.factory.incus_vm.set_address_on_up(None);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    let err = ws.up(h.env.as_ref()).expect_err("address missing");

    assert!(matches!(
        err.downcast_ref::<WorkstationError>(),
        Some(WorkstationError::VmAddressMissing)
    ));
    assert!(h.rec.contains("incus-vm.up"));
    assert!(!h.rec.contains("network.configure_guest"));
    assert!(!h.rec.contains("runtime.up"));
}

#[test]
fn test_incus_configures_guest_right_after_vm_up() {
    let h = Harness::new();
    h.set("vm.driver", "colima").set("provider", "incus");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.up(h.env.as_ref()).expect("up");

    let calls = h.rec.calls();
    let vm_up = h.rec.index_of("incus-vm.up");
    assert_eq!(calls[vm_up + 1], "network.configure_guest");
    h.rec
        .assert_order(&["incus-vm.write_config", "incus-vm.up", "runtime.write_config"]);
}

#[test]
fn test_service_write_failure_names_service_and_stops() {
    let h = Harness::new();
    h.set("docker.enabled", true);
    h.rec.fail_on("service.b.write_config");
    let mut ws = h.workstation().with_services(vec![
        FakeService::shared(&h.rec, "a"),
        FakeService::shared(&h.rec, "b"),
        FakeService::shared(&h.rec, "c"),
    ]);
    ws.prepare().expect("prepare");

    let err = ws.up(h.env.as_ref()).expect_err("service fails");

    assert!(
        chain(&err).starts_with("failed to write config for service b"),
        "{err:#}"
    );
    assert!(h.rec.contains("service.a.write_config"));
    assert!(!h.rec.contains("service.c.write_config"));
    assert!(!h.rec.contains("runtime.write_config"));
}

#[test]
fn test_non_colima_inline_setup_configures_dns_only() {
    let h = Harness::new();
    h.set("docker.enabled", true).set("dns.enabled", true);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.up(h.env.as_ref()).expect("up");

    assert!(h.rec.contains("network.configure_dns"));
    assert!(!h.rec.contains("network.configure_guest"));
    assert!(!h.rec.contains("network.configure_host_route"));
}

#[test]
fn test_dns_disabled_skips_resolver_setup() {
    let h = colima_harness();
    h.set("dns.enabled", false);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.up(h.env.as_ref()).expect("up");

    assert!(h.rec.contains("network.configure_host_route"));
    assert!(!h.rec.contains("network.configure_dns"));
}

// ============================================================================
// Deferred network setup and the apply hook
// ============================================================================

#[test]
fn test_prepare_for_up_decides_deferral() {
    let cases = [
        (Some(&["network", "workstation"][..]), None, true),
        (Some(&["network", "workstation"][..]), Some(true), true),
        (Some(&["network", "workstation"][..]), Some(false), false),
        (Some(&["network"][..]), None, false),
        (Some(&[][..]), Some(true), false),
        (None, Some(true), false),
    ];
    for (components, terraform_enabled, expected) in cases {
        let h = Harness::new();
        if let Some(enabled) = terraform_enabled {
            h.set("terraform.enabled", enabled);
        }
        let mut ws = h.workstation();
        let bp = components.map(blueprint);

        ws.prepare_for_up(bp.as_ref());

        assert_eq!(
            ws.defers_host_guest_setup(),
            expected,
            "components={components:?} terraform.enabled={terraform_enabled:?}"
        );
    }
}

#[test]
fn test_no_blueprint_clears_deferral() {
    let h = Harness::new();
    let mut ws = h.workstation();
    ws.prepare_for_up(Some(&blueprint(&["workstation"])));
    assert!(ws.defers_host_guest_setup());

    ws.prepare_for_up(None);

    assert!(!ws.defers_host_guest_setup());
    assert!(ws.make_apply_hook().is_none());
}

#[test]
fn test_deferred_up_skips_network_and_hook_runs_it_for_workstation() {
    let h = colima_harness();
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    ws.prepare_for_up(Some(&blueprint(&["network", "workstation"])));

    ws.up(h.env.as_ref()).expect("up");

    assert!(h.rec.matching("network.configure").is_empty());

    let hook = ws.make_apply_hook().expect("hook when deferred");
    hook("network").expect("other components are ignored");
    assert!(h.rec.matching("network.configure").is_empty());

    hook("workstation").expect("workstation hook");
    assert_eq!(
        h.rec.matching("network.configure"),
        vec![
            "network.configure_guest",
            "network.configure_host_route",
            "network.configure_dns"
        ]
    );
}

#[test]
fn test_hook_omits_guest_and_route_without_colima() {
    let h = Harness::new();
    h.set("docker.enabled", true).set("dns.enabled", true);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    ws.prepare_for_up(Some(&blueprint(&["workstation"])));
    ws.up(h.env.as_ref()).expect("up");

    let hook = ws.make_apply_hook().expect("hook");
    hook("workstation").expect("hook");

    assert_eq!(
        h.rec.matching("network.configure"),
        vec!["network.configure_dns"]
    );
}

#[test]
fn test_hook_errors_surface_with_step_context() {
    let h = colima_harness();
    h.rec.fail_on("network.configure_host_route");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    ws.prepare_for_up(Some(&blueprint(&["workstation"])));

    let hook = ws.make_apply_hook().expect("hook");
    let err = hook("workstation").expect_err("route fails");

    assert!(chain(&err).starts_with("failed to configure host route"), "{err:#}");
    assert!(!h.rec.contains("network.configure_dns"));
}

#[test]
fn test_no_hook_when_setup_is_inline() {
    let h = colima_harness();
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    ws.prepare_for_up(Some(&blueprint(&["network"])));

    assert!(ws.make_apply_hook().is_none());
}

// ============================================================================
// Privilege pre-flight
// ============================================================================

#[test]
fn test_privilege_check_skipped_when_not_needed() {
    let h = Harness::new();
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.ensure_network_privilege().expect("no privilege needed");

    assert!(h.rec.matching("sudo").is_empty());
    assert!(h.rec.matching("silent sudo").is_empty());
}

#[test]
fn test_privilege_check_skipped_without_network() {
    let h = Harness::new();
    h.factory.set_needs_privilege(true);
    let ws = h.workstation();

    ws.ensure_network_privilege().expect("nothing prepared");

    assert!(h.rec.calls().is_empty());
}

#[test]
fn test_privilege_check_accepts_interactive_sudo() {
    let h = Harness::new();
    h.factory.set_needs_privilege(true);
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.ensure_network_privilege().expect("sudo works");

    assert!(h.rec.contains("sudo true"));
    assert!(!h.rec.contains("silent sudo -n true"));
}

#[test]
fn test_privilege_check_falls_back_to_passwordless_sudo() {
    let h = Harness::new();
    h.factory.set_needs_privilege(true);
    h.rec.fail_on("sudo true");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    ws.ensure_network_privilege().expect("passwordless sudo works");

    h.rec.assert_order(&["sudo true", "silent sudo -n true"]);
}

#[test]
fn test_privilege_check_fails_when_both_probes_fail() {
    let h = Harness::new();
    h.factory.set_needs_privilege(true);
    h.rec.fail_on("sudo true");
    h.rec.fail_on("silent sudo -n true");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    let err = ws.ensure_network_privilege().expect_err("no privilege");

    assert!(matches!(
        err.downcast_ref::<PrivilegeError>(),
        Some(PrivilegeError::Required)
    ));
}

// ============================================================================
// down
// ============================================================================

#[test]
fn test_down_with_nothing_built_is_noop() {
    let h = colima_harness();
    let ws = h.workstation();

    ws.down().expect("noop");

    assert!(h.rec.calls().is_empty());
}

#[test]
fn test_down_stops_runtime_then_vm() {
    let h = colima_harness();
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    h.rec.clear();

    ws.down().expect("down");

    assert_eq!(h.rec.calls(), vec!["runtime.down", "vm.down"]);
}

#[test]
fn test_down_incus_on_colima_configures_guest_first() {
    let h = Harness::new();
    h.set("vm.driver", "colima").set("provider", "incus");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");
    h.rec.clear();

    ws.down().expect("down");

    assert_eq!(
        h.rec.calls(),
        vec!["network.configure_guest", "runtime.down", "incus-vm.down"]
    );
}

#[test]
fn test_down_aborts_on_runtime_failure() {
    let h = colima_harness();
    h.rec.fail_on("runtime.down");
    let mut ws = h.workstation();
    ws.prepare().expect("prepare");

    let err = ws.down().expect_err("runtime fails");

    assert!(chain(&err).starts_with("failed to stop container runtime"), "{err:#}");
    assert!(!h.rec.contains("vm.down"));
}
