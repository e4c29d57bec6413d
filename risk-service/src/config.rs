//! Service configuration loading.
//!
//! Loads configuration from `weatherguard.toml` in the working directory
//! (or the path in `WEATHERGUARD_CONFIG`, or `--config`). A missing file
//! means defaults. Command-line flags override file values.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use weatherguard_model::DEFAULT_MLRUNS_DIR;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("workers must be at least 1")]
    NoWorkers,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration for the risk service
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Root of the experiment tree searched for model artifacts
    #[serde(default = "default_mlruns_dir")]
    pub mlruns_dir: PathBuf,

    /// Number of request-handling worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_mlruns_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MLRUNS_DIR)
}

fn default_workers() -> usize {
    4
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            mlruns_dir: default_mlruns_dir(),
            workers: default_workers(),
            log_filter: default_log_filter(),
        }
    }
}

/// Values given on the command line, each replacing the file value when set.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub mlruns_dir: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl ServiceConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "WEATHERGUARD_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "weatherguard.toml";

    /// Resolution order:
    /// 1. explicit path (`--config`)
    /// 2. `WEATHERGUARD_CONFIG` environment variable
    /// 3. `./weatherguard.toml`
    pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }
        PathBuf::from(Self::DEFAULT_CONFIG_FILENAME)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: ServiceConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(bind_addr) = overrides.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(mlruns_dir) = overrides.mlruns_dir {
            self.mlruns_dir = mlruns_dir;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        self.validate()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|source| ConfigError::BindAddr {
                value: self.bind_addr.clone(),
                source,
            })
    }

    fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}
