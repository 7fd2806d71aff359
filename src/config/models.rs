use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub seller: SellerConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Event ingress server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Largest accepted job event body, in bytes
    #[serde(default = "default_max_event_bytes")]
    pub max_event_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_event_bytes: default_max_event_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_event_bytes() -> usize {
    1024 * 1024
}

/// Identity of the seller and where its offerings live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SellerConfig {
    /// Events addressed to a different provider are ignored when set
    pub wallet_address: Option<String>,
    #[serde(default = "default_offerings_dir")]
    pub offerings_dir: PathBuf,
}

impl Default for SellerConfig {
    fn default() -> Self {
        Self {
            wallet_address: None,
            offerings_dir: default_offerings_dir(),
        }
    }
}

fn default_offerings_dir() -> PathBuf {
    PathBuf::from("offerings")
}

/// Marketplace API used by the HTTP action sink
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Loaded from environment, never from the config file
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Job pipeline behaviour
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Upper bound on each handler capability call; unbounded when unset
    pub capability_timeout_secs: Option<u64>,
    /// Drop redelivered events for jobs whose pipeline is still running
    #[serde(default)]
    pub dedupe_in_flight: bool,
}

impl RuntimeConfig {
    pub fn capability_timeout(&self) -> Option<Duration> {
        self.capability_timeout_secs.map(Duration::from_secs)
    }
}
