//! DNS rendering: the CoreDNS config served to the workstation and the
//! host resolver stanza that points the local domain at it.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ConfigError;

const UPSTREAMS: &str = "1.1.1.1 8.8.8.8";

static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .expect("valid domain regex")
});

/// The DNS domain ends up in file names and privileged shell commands.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDomain`] unless `domain` is a hostname of
/// at most 253 characters.
pub fn validate_domain(domain: &str) -> Result<(), ConfigError> {
    if domain.len() > 253 || !DOMAIN.is_match(domain) {
        return Err(ConfigError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

/// Render a Corefile answering `domain` from `hosts` and forwarding the rest.
#[must_use]
pub fn render_corefile(domain: &str, hosts: &[(String, String)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{domain}:53 {{");
    out.push_str("    hosts {\n");
    for (hostname, address) in hosts {
        let _ = writeln!(out, "        {address} {hostname}");
    }
    out.push_str("        fallthrough\n    }\n");
    let _ = writeln!(out, "    reload\n    loop\n    forward . {UPSTREAMS}\n}}");
    let _ = writeln!(out, ".:53 {{\n    reload\n    loop\n    forward . {UPSTREAMS}\n}}");
    out
}

/// Host operating systems with distinct resolver mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Macos,
    Linux,
}

impl HostOs {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else {
            Self::Linux
        }
    }
}

/// Where the resolver stanza for `domain` lives and what it contains.
#[must_use]
pub fn resolver_stanza(os: HostOs, domain: &str, nameserver: &str) -> (String, String) {
    match os {
        HostOs::Macos => (
            format!("/etc/resolver/{domain}"),
            format!("nameserver {nameserver}\n"),
        ),
        HostOs::Linux => (
            format!("/etc/systemd/resolved.conf.d/basecamp-{domain}.conf"),
            format!("[Resolve]\nDNS={nameserver}\nDomains=~{domain}\n"),
        ),
    }
}
