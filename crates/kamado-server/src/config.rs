use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use derivative::Derivative;
use kamado::EngineConfig;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Derivative, Clone, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct Config {
    pub listen: ListenerOption,
    pub engine: EngineConfig,
    pub model: ModelOption,
    pub gateway: GatewayOption,
    #[derivative(Default(value = "LevelFilter::Info"))]
    pub log_level: LevelFilter,
}

#[derive(Debug, Derivative, Clone, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct ListenerOption {
    /// Ip to listen to.
    #[derivative(Default(value = "IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))"))]
    pub address: IpAddr,
    /// Binding port.
    #[derivative(Default(value = "9999u16"))]
    pub port: u16,
}

impl ListenerOption {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Returns the tail of each prompt. Needs no weights.
    #[default]
    Echo,
}

/// Which model to serve. The engine never looks inside this.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOption {
    pub kind: ModelKind,
    /// Checkpoint location, for kinds that load weights.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Derivative, Clone, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct GatewayOption {
    /// Independent samples generated for every client request.
    #[derivative(Default(value = "2"))]
    pub samples_per_request: usize,
    /// Used when the client does not send `top_p`.
    #[derivative(Default(value = "0.9"))]
    pub default_top_p: f32,
    /// Used when the client does not send `temperature`.
    #[derivative(Default(value = "1.0"))]
    pub default_temperature: f32,
    /// Give up waiting for completions after this many seconds. Waits forever when unset.
    pub response_timeout_secs: Option<u64>,
}
