use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::evictor::DEFAULT_RETENTION;

/// Default upload ceiling: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Address to listen on
    #[arg(long = "listen", short, env = "TEMPSTORE_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen_addr: SocketAddr,

    /// Storage directory path
    #[arg(long = "storage", short, env = "TEMPSTORE_STORAGE", default_value = "./temp_uploads")]
    pub storage_path: PathBuf,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "TEMPSTORE_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Age in seconds after which stored files are evicted
    #[arg(long = "retention", env = "TEMPSTORE_RETENTION", default_value_t = DEFAULT_RETENTION.as_secs())]
    pub retention_secs: u64,

    /// Run a sweep every this many seconds (disabled if unset)
    #[arg(long = "sweep-interval", env = "TEMPSTORE_SWEEP_INTERVAL")]
    pub sweep_interval_secs: Option<u64>,

    /// Prefix for the addresses reported for stored files
    #[arg(long, env = "TEMPSTORE_PUBLIC_BASE", default_value = "/files")]
    pub public_base: String,
}

impl Config {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            storage_path: PathBuf::from("./temp_uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            retention_secs: DEFAULT_RETENTION.as_secs(),
            sweep_interval_secs: None,
            public_base: "/files".into(),
        }
    }
}
