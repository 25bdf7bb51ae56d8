//! Address planning for the workstation network.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::domain::error::ConfigError;

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    /// First host address, reserved for the bridge gateway.
    #[must_use]
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) + 1)
    }

    /// Number of addresses available to services (gateway and broadcast excluded).
    #[must_use]
    pub fn service_capacity(&self) -> usize {
        let size = u64::from(!self.mask()) + 1;
        usize::try_from(size.saturating_sub(3)).unwrap_or(usize::MAX)
    }

    /// Host addresses for `count` services, starting after the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AddressSpaceExhausted`] if the block is too small.
    pub fn allocate(&self, count: usize) -> Result<Vec<Ipv4Addr>, ConfigError> {
        let capacity = self.service_capacity();
        if count > capacity {
            return Err(ConfigError::AddressSpaceExhausted {
                cidr: self.to_string(),
                capacity,
                requested: count,
            });
        }
        let base = u32::from(self.network) + 2;
        Ok((0..count)
            .map(|i| Ipv4Addr::from(base + u32::try_from(i).unwrap_or(u32::MAX - base)))
            .collect())
    }
}

impl FromStr for Cidr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidCidr(s.to_string());
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        if prefix > 30 {
            return Err(invalid());
        }
        let mut cidr = Self {
            network: addr,
            prefix,
        };
        cidr.network = Ipv4Addr::from(u32::from(addr) & cidr.mask());
        Ok(cidr)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Shell script run inside the colima guest to forward traffic between the
/// VM's host-facing interface and the workstation bridge. Idempotent: each
/// rule is checked before it is appended.
#[must_use]
pub fn guest_forwarding_script(cidr: &Cidr, host_interface: &str) -> String {
    let rules = [
        format!("FORWARD -i {host_interface} -d {cidr} -j ACCEPT"),
        format!("FORWARD -s {cidr} -o {host_interface} -j ACCEPT"),
    ];
    let mut script = String::from("set -e\n");
    for rule in rules {
        script.push_str(&format!(
            "sudo iptables -C {rule} 2>/dev/null || sudo iptables -A {rule}\n"
        ));
    }
    script
}
