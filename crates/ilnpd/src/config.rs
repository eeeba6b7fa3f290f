//! Node configuration: identity, UDP multicast transport settings, and the mock-sensor/monitor
//! experiment parameters.
//!
//! Grounded on `config.py::Configuration`, ported from an INI section read by `ConfigParser` to
//! a TOML document read with `serde`, the way the rest of this workspace prefers `serde`-backed
//! formats over hand-rolled parsing. The CLI surface (`--config`/`--section` is dropped in favour
//! of one node per TOML file) is built with `clap`, mirroring how `Cach30verfl0w-Octavius`'s
//! daemon binary entry point takes its runtime knobs from flags rather than environment variables.

use serde::Deserialize;
use std::{
    net::Ipv6Addr,
    path::PathBuf,
};
use thiserror::Error;

const LINK_LOCAL_MULTICAST_PREFIX: &str = "ff02";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("unable to parse configuration file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("malformed multicast group id '{0}'")]
    InvalidGroupId(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    /// Hex string used to namespace this deployment's multicast addresses, analogous to the
    /// original prototype's `getuid()`-derived unique identifier.
    pub unique_identifier: String,

    pub my_id: u64,
    pub my_locator: u64,

    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_buffer_size")]
    pub packet_buffer_size_bytes: usize,
    #[serde(default = "default_loopback")]
    pub loopback: bool,
    /// Hex group ids (not full addresses) this node should join, one per neighbouring locator.
    pub mcast_groups: Vec<String>,

    pub max_sends: u32,
    pub sink_id: Option<u64>,
    pub interval_secs: u64,
    pub sink_log_file: Option<PathBuf>,
    pub results_file: Option<PathBuf>,
}

fn default_port() -> u16 {
    8080
}

fn default_buffer_size() -> usize {
    512
}

fn default_loopback() -> bool {
    true
}

/// Resolved runtime configuration for one node: still carries the raw section's knobs, plus the
/// computed multicast addresses derived from `unique_identifier`.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub section: NodeSection,
    pub mcast_group_addresses: Vec<Ipv6Addr>,
    pub my_group_address: Ipv6Addr,
}

impl NodeConfig {
    pub fn load(path: &std::path::Path, section_name: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let document: toml::Value = toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        let section_value = document.get(section_name).cloned().unwrap_or(document);
        let section: NodeSection = section_value.try_into().map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        Self::from_section(section)
    }

    pub fn from_section(section: NodeSection) -> Result<Self, ConfigError> {
        let mcast_group_addresses = section.mcast_groups.iter().map(|group_id| build_multicast_address(&section.unique_identifier, group_id)).collect::<Result<Vec<_>, _>>()?;

        let my_group_id = format!("{:x}", section.my_id);
        let my_group_address = build_multicast_address(&section.unique_identifier, &my_group_id)?;

        Ok(Self {
            section,
            mcast_group_addresses,
            my_group_address,
        })
    }
}

/// Builds the link-local IPv6 multicast address `ff02::<unique_identifier>:<group_id>` used to
/// emulate a per-deployment broadcast domain on a shared machine or test network.
fn build_multicast_address(unique_identifier: &str, group_id: &str) -> Result<Ipv6Addr, ConfigError> {
    let address_text = format!("{LINK_LOCAL_MULTICAST_PREFIX}::{unique_identifier}:{group_id}");
    address_text.parse().map_err(|_| ConfigError::InvalidGroupId(group_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_section() -> NodeSection {
        NodeSection {
            unique_identifier: "1a2b".into(),
            my_id: 1,
            my_locator: 10,
            port: 9000,
            packet_buffer_size_bytes: 512,
            loopback: true,
            mcast_groups: vec!["1".into(), "2".into()],
            max_sends: 1000,
            sink_id: Some(1),
            interval_secs: 5,
            sink_log_file: None,
            results_file: None,
        }
    }

    #[test]
    fn builds_multicast_addresses_from_unique_identifier_and_group() {
        let config = NodeConfig::from_section(sample_section()).unwrap();
        assert_eq!(config.mcast_group_addresses.len(), 2);
        assert_eq!(config.my_group_address, "ff02::1a2b:1".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn rejects_malformed_group_id() {
        let mut section = sample_section();
        section.mcast_groups = vec!["not a valid group".into()];
        assert!(NodeConfig::from_section(section).is_err());
    }
}
