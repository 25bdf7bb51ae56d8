//! Container-compose document model rendered by the docker runtime.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::network::Cidr;

/// Name of the bridge network every workstation service joins.
pub const NETWORK_NAME: &str = "basecamp";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
    pub restart: String,
    /// Filled in by the runtime from the service's assigned address.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, ServiceNetwork>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceNetwork {
    pub ipv4_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    pub networks: BTreeMap<String, ComposeNetwork>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeNetwork {
    pub driver: String,
    pub ipam: Ipam,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ipam {
    pub config: Vec<IpamConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpamConfig {
    pub subnet: String,
    pub gateway: String,
}

impl ComposeFile {
    /// A compose document with the workstation bridge on `cidr` and no services.
    #[must_use]
    pub fn new(cidr: &Cidr) -> Self {
        let network = ComposeNetwork {
            driver: "bridge".to_string(),
            ipam: Ipam {
                config: vec![IpamConfig {
                    subnet: cidr.to_string(),
                    gateway: cidr.gateway().to_string(),
                }],
            },
        };
        Self {
            services: BTreeMap::new(),
            networks: BTreeMap::from([(NETWORK_NAME.to_string(), network)]),
        }
    }

    /// Adds a service pinned to `address` on the workstation bridge.
    pub fn add_service(&mut self, name: &str, mut service: ComposeService, address: Option<String>) {
        if let Some(ipv4_address) = address {
            service
                .networks
                .insert(NETWORK_NAME.to_string(), ServiceNetwork { ipv4_address });
        }
        self.services.insert(name.to_string(), service);
    }
}
