use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::colormap::Colormap;

/// Settings shared by the ingestion CLI and the server.
///
/// Resolution order: built-in defaults, then the optional TOML file, then
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the `depth_rows` table.
    pub db_path: PathBuf,

    pub host: String,

    pub port: u16,

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,

    /// Colormap used when a request does not name one.
    pub default_colormap: Colormap,

    /// Requests reaching outside these bounds are rejected.
    pub depth_bounds: DepthBounds,

    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DepthBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for DepthBounds {
    fn default() -> Self {
        DepthBounds {
            min: -1e6,
            max: 1e6,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("./depthmap.sqlite3"),
            host: "0.0.0.0".to_owned(),
            port: 8000,
            log_level: "info".to_owned(),
            default_colormap: Colormap::default(),
            depth_bounds: DepthBounds::default(),
            request_timeout_secs: 2,
        }
    }
}

impl Config {
    pub const DB_PATH_VAR: &'static str = "DEPTHMAP_DB_PATH";
    pub const HOST_VAR: &'static str = "API_HOST";
    pub const PORT_VAR: &'static str = "API_PORT";
    pub const LOG_LEVEL_VAR: &'static str = "LOG_LEVEL";
    pub const COLORMAP_VAR: &'static str = "DEFAULT_COLORMAP";
    pub const TIMEOUT_VAR: &'static str = "REQUEST_TIMEOUT_SECS";

    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {path:?}"))?;
        toml::from_str(&buf).with_context(|| format!("invalid config {path:?}"))
    }

    /// Override fields from `var`, which is `std::env::var` outside of tests.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) -> Result<()> {
        if let Some(db_path) = var(Self::DB_PATH_VAR) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(host) = var(Self::HOST_VAR) {
            self.host = host;
        }
        if let Some(port) = var(Self::PORT_VAR) {
            self.port = port
                .parse()
                .with_context(|| format!("invalid {}: {port}", Self::PORT_VAR))?;
        }
        if let Some(log_level) = var(Self::LOG_LEVEL_VAR) {
            self.log_level = log_level.to_lowercase();
        }
        if let Some(colormap) = var(Self::COLORMAP_VAR) {
            self.default_colormap = colormap.parse()?;
        }
        if let Some(timeout) = var(Self::TIMEOUT_VAR) {
            self.request_timeout_secs = timeout
                .parse()
                .with_context(|| format!("invalid {}: {timeout}", Self::TIMEOUT_VAR))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let DepthBounds { min, max } = self.depth_bounds;
        if !(min <= max) {
            bail!("depth_bounds.min({min}) exceeds depth_bounds.max({max})");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {addr}"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
