use anyhow::Result;
use config as config_loader;
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::Path;

use crate::chains::Protocol;

/// Global config structure
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub diagnose: DiagnoseConfig,
    pub blocks_store: BlocksStoreConfig,
    pub search_store: SearchStoreConfig,
    pub kvdb: KvdbConfig,
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub dmesh: DmeshConfig,
    pub logging: LoggingConfig,
}

/// HTTP server config
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_listen_addr")]
    pub listen_addr: String,
}

impl ServerConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }
}

/// Which chain is being diagnosed and under which deployment namespace
#[derive(Debug, Deserialize, Clone)]
pub struct DiagnoseConfig {
    pub protocol: Protocol,
    #[serde(default)]
    pub namespace: String,
}

/// Block archive store config
#[derive(Debug, Deserialize, Clone)]
pub struct BlocksStoreConfig {
    pub path: String,
    /// Block count covered by one archive file.
    #[serde(default = "BlocksStoreConfig::default_file_step")]
    pub file_step: u32,
    #[serde(default = "BlocksStoreConfig::default_checkpoint_every")]
    pub checkpoint_every: u64,
    #[serde(default = "BlocksStoreConfig::default_progress_every")]
    pub progress_every: u64,
}

impl BlocksStoreConfig {
    fn default_file_step() -> u32 {
        100
    }
    fn default_checkpoint_every() -> u64 {
        10_000
    }
    fn default_progress_every() -> u64 {
        10_000
    }
}

/// Search index shard store config
#[derive(Debug, Deserialize, Clone)]
pub struct SearchStoreConfig {
    pub path: String,
    /// Block count covered by one index shard. Overridable per request.
    #[serde(default = "SearchStoreConfig::default_shard_size")]
    pub shard_size: u32,
    #[serde(default = "SearchStoreConfig::default_checkpoint_every")]
    pub checkpoint_every: u64,
    #[serde(default = "SearchStoreConfig::default_progress_every")]
    pub progress_every: u64,
}

impl SearchStoreConfig {
    fn default_shard_size() -> u32 {
        5_000
    }
    fn default_checkpoint_every() -> u64 {
        1_000
    }
    fn default_progress_every() -> u64 {
        5_000
    }
}

/// Wide-column chain database config
#[derive(Debug, Deserialize, Clone)]
pub struct KvdbConfig {
    pub path: String,
    #[serde(default = "KvdbConfig::default_progress_every")]
    pub progress_every: u64,
    #[serde(default = "KvdbConfig::default_checkpoint_every")]
    pub checkpoint_every: u64,
    /// Concurrent readers for the trx validation scan.
    #[serde(default = "KvdbConfig::default_trx_concurrency")]
    pub trx_concurrency: usize,
}

impl KvdbConfig {
    fn default_progress_every() -> u64 {
        5_000
    }
    fn default_checkpoint_every() -> u64 {
        200_000
    }
    fn default_trx_concurrency() -> usize {
        16
    }
}

/// Health-check targets for the surrounding deployment
#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,
    #[serde(default = "ClusterConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClusterConfig {
    fn default_timeout_secs() -> u64 {
        5
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceEndpoint {
    pub name: String,
    pub url: String,
}

/// Search-mesh peers for the peer stream
#[derive(Debug, Deserialize, Clone)]
pub struct DmeshConfig {
    #[serde(default = "DmeshConfig::default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub peers: Vec<PeerSeed>,
    #[serde(default = "DmeshConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "DmeshConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl DmeshConfig {
    fn default_service_version() -> String {
        "v1".to_string()
    }
    fn default_poll_interval_secs() -> u64 {
        30
    }
    fn default_timeout_secs() -> u64 {
        5
    }
}

impl Default for DmeshConfig {
    fn default() -> Self {
        Self {
            service_version: Self::default_service_version(),
            peers: Vec::new(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PeerSeed {
    pub key: String,
    pub host: String,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub first_block_num: u32,
    #[serde(default)]
    pub shard_size: u32,
}

/// Logging config
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default = "LoggingConfig::default_to_file")]
    pub to_file: bool,
    #[serde(default = "LoggingConfig::default_file_path")]
    pub file_path: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_to_file() -> bool {
        true
    }
    fn default_file_path() -> String {
        "./logs/diagnose.log".to_string()
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv().ok(); // Load the .env file

        if !path.as_ref().exists() {
            anyhow::bail!("Config file not found: {:?}", path.as_ref());
        }

        // Use config crate to parse the config file
        let builder = config_loader::Config::builder()
            .add_source(config_loader::File::from(path.as_ref().to_path_buf()))
            .add_source(config_loader::Environment::with_prefix("DIAGNOSE").separator("__"))
            .build()?;

        Ok(builder.try_deserialize::<AppConfig>()?)
    }
}
