use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use crate::ingest::udp::{DEFAULT_BUFFER_BYTES, DEFAULT_RECV_TIMEOUT};
use crate::ingest::IngestOptions;
use crate::wire::{UnitLayout, DEFAULT_PACKETS_PER_UNIT};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug, Deserialize, Default)]
struct IngestConfigFile {
    listen: Option<ListenConfigFile>,
    buffer: Option<BufferConfigFile>,
    multicast: Option<MulticastConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ListenConfigFile {
    addr: Option<IpAddr>,
    port: Option<u16>,
    recv_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct BufferConfigFile {
    bytes: Option<usize>,
    packets_per_unit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct MulticastConfigFile {
    group: Option<Ipv4Addr>,
}

/// Daemon configuration: an optional file named by `TS_INGEST_CONFIG`, then
/// `TS_INGEST_*` environment overrides.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub recv_timeout: Duration,
    /// Requested ring size. Rounded down to whole units by `validate`.
    pub buffer_bytes: usize,
    pub packets_per_unit: usize,
    pub multicast_group: Option<Ipv4Addr>,
}

impl IngestConfig {
    pub fn load() -> Result<Self> {
        let config_path = env_value("TS_INGEST_CONFIG");
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, reading the given file instead of `TS_INGEST_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: IngestConfigFile) -> Self {
        let listen = file.listen.unwrap_or_default();
        let buffer = file.buffer.unwrap_or_default();
        Self {
            bind_addr: listen.addr.unwrap_or(DEFAULT_BIND_ADDR),
            port: listen.port.unwrap_or(DEFAULT_PORT),
            recv_timeout: listen
                .recv_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RECV_TIMEOUT),
            buffer_bytes: buffer.bytes.unwrap_or(DEFAULT_BUFFER_BYTES),
            packets_per_unit: buffer.packets_per_unit.unwrap_or(DEFAULT_PACKETS_PER_UNIT),
            multicast_group: file.multicast.and_then(|multicast| multicast.group),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = env_value("TS_INGEST_BIND_ADDR") {
            self.bind_addr = addr
                .parse()
                .map_err(|_| anyhow!("TS_INGEST_BIND_ADDR must be an IP address"))?;
        }
        if let Some(port) = env_value("TS_INGEST_PORT") {
            self.port = port
                .parse()
                .map_err(|_| anyhow!("TS_INGEST_PORT must be a port number"))?;
        }
        if let Some(timeout) = env_value("TS_INGEST_RECV_TIMEOUT_MS") {
            let millis: u64 = timeout.parse().map_err(|_| {
                anyhow!("TS_INGEST_RECV_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.recv_timeout = Duration::from_millis(millis);
        }
        if let Some(bytes) = env_value("TS_INGEST_BUFFER_BYTES") {
            self.buffer_bytes = bytes
                .parse()
                .map_err(|_| anyhow!("TS_INGEST_BUFFER_BYTES must be an integer byte count"))?;
        }
        if let Some(packets) = env_value("TS_INGEST_PACKETS_PER_UNIT") {
            self.packets_per_unit = packets
                .parse()
                .map_err(|_| anyhow!("TS_INGEST_PACKETS_PER_UNIT must be an integer"))?;
        }
        if let Some(group) = env_value("TS_INGEST_MULTICAST_GROUP") {
            self.multicast_group = Some(
                group
                    .parse()
                    .map_err(|_| anyhow!("TS_INGEST_MULTICAST_GROUP must be an IPv4 address"))?,
            );
        }
        Ok(())
    }

    /// Check ranges and round the buffer down to whole units.
    pub fn validate(&mut self) -> Result<()> {
        let layout = UnitLayout::new(self.packets_per_unit)?;
        if self.recv_timeout.is_zero() {
            return Err(anyhow!("receive timeout must be greater than zero"));
        }
        let rounded = layout.whole_units(self.buffer_bytes);
        if rounded == 0 {
            return Err(anyhow!(
                "buffer of {} bytes is smaller than one {} byte unit",
                self.buffer_bytes,
                layout.unit_size()
            ));
        }
        self.buffer_bytes = rounded;
        if let Some(group) = self.multicast_group {
            if !group.is_multicast() {
                return Err(anyhow!("{} is not a multicast address", group));
            }
            if !self.bind_addr.is_ipv4() {
                return Err(anyhow!("multicast requires an IPv4 bind address"));
            }
        }
        Ok(())
    }

    pub fn options(&self) -> Result<IngestOptions> {
        Ok(IngestOptions {
            bind_addr: self.bind_addr,
            port: self.port,
            buffer_capacity: self.buffer_bytes,
            layout: UnitLayout::new(self.packets_per_unit)?,
            recv_timeout: self.recv_timeout,
            multicast_group: self.multicast_group,
        })
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::from_file(IngestConfigFile::default())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<IngestConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: IngestConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
