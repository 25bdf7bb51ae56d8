//! Colima profile configuration.

use serde::Serialize;

/// The subset of colima's `colima.yaml` the workstation controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColimaConfig {
    pub cpu: u32,
    /// Memory in GiB.
    pub memory: u32,
    /// Disk in GiB.
    pub disk: u32,
    pub arch: String,
    /// `docker` or `incus`.
    pub runtime: String,
    #[serde(rename = "vmType")]
    pub vm_type: String,
    pub network: ColimaNetwork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColimaNetwork {
    pub address: bool,
}

impl ColimaConfig {
    /// Defaults sized from the host: half the CPUs, 8 GiB, 60 GiB disk.
    #[must_use]
    pub fn sized_for_host(host_cpus: u32, runtime: &str) -> Self {
        let arch = match std::env::consts::ARCH {
            "aarch64" => "aarch64",
            _ => "x86_64",
        };
        Self {
            cpu: (host_cpus / 2).max(2),
            memory: 8,
            disk: 60,
            arch: arch.to_string(),
            runtime: runtime.to_string(),
            vm_type: if cfg!(target_os = "macos") { "vz" } else { "qemu" }.to_string(),
            network: ColimaNetwork { address: true },
        }
    }
}

/// Parse the address of `profile` out of `colima ls --json` output (one JSON
/// object per line).
#[must_use]
pub fn parse_colima_address(ls_json: &str, profile: &str) -> Option<String> {
    ls_json
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|entry| entry.get("name").and_then(|n| n.as_str()) == Some(profile))
        .and_then(|entry| entry.get("address")?.as_str().map(str::to_string))
        .filter(|address| !address.is_empty())
}
