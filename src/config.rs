// src/config.rs
//! Configuration file parsing
//!
//! Supports a TOML configuration file with the following sections:
//! - [server] - Bind address
//! - [database] - SQLite file location
//! - [fetch] - External fetch commands, timeout and concurrency

use crate::fetch::NixFetcher;
use crate::lifecycle::EngineConfig;
use crate::server::ServerConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PARCEL_CONFIG";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ParcelConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub fetch: FetchSection,
}

/// Server configuration section
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// HTTP bind address
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Database configuration section
#[derive(Debug, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./parcel.db")
}

/// Fetch configuration section
#[derive(Debug, Deserialize)]
pub struct FetchSection {
    /// Upper bound on one fetch (e.g., "30m", "2h")
    #[serde(default = "default_fetch_timeout")]
    pub timeout: String,

    /// Maximum concurrent fetches
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Version lookup command, program first
    #[serde(default = "default_eval_command")]
    pub eval_command: Vec<String>,

    /// Build command, program first
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,

    /// Package set expression
    #[serde(default = "default_nixpkgs")]
    pub nixpkgs: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            max_concurrent: default_max_concurrent(),
            eval_command: default_eval_command(),
            build_command: default_build_command(),
            nixpkgs: default_nixpkgs(),
        }
    }
}

fn default_fetch_timeout() -> String {
    "30m".to_string()
}

fn default_max_concurrent() -> usize {
    2
}

fn default_eval_command() -> Vec<String> {
    vec!["nix-instantiate".to_string()]
}

fn default_build_command() -> Vec<String> {
    vec!["nix-build".to_string()]
}

fn default_nixpkgs() -> String {
    "<nixpkgs>".to_string()
}

impl ParcelConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ParcelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the file named by `PARCEL_CONFIG`, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(env_path) => Self::load(Path::new(&env_path)),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        let timeout = self.fetch_timeout()?;
        if timeout.is_zero() {
            anyhow::bail!("fetch.timeout must be greater than zero");
        }

        if self.fetch.max_concurrent == 0 {
            anyhow::bail!("fetch.max_concurrent must be at least 1");
        }

        if self.fetch.eval_command.is_empty() {
            anyhow::bail!("fetch.eval_command must name a program");
        }
        if self.fetch.build_command.is_empty() {
            anyhow::bail!("fetch.build_command must name a program");
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server.bind address: {}", self.server.bind))
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        parse_duration(&self.fetch.timeout)
            .with_context(|| format!("Invalid fetch.timeout: {}", self.fetch.timeout))
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            fetch_timeout: self.fetch_timeout()?,
            max_concurrent: self.fetch.max_concurrent,
        })
    }

    pub fn fetcher(&self) -> NixFetcher {
        NixFetcher::new()
            .with_eval_command(self.fetch.eval_command.clone())
            .with_build_command(self.fetch.build_command.clone())
            .with_nixpkgs(self.fetch.nixpkgs.clone())
    }

    /// Convert to the runtime server configuration
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind_addr: self.bind_addr()?,
            db_path: self.database.path.clone(),
            engine: self.engine_config()?,
            fetcher: self.fetcher(),
        })
    }
}

/// Parse a duration string (e.g., "30s", "15m", "1h", "2d")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = match s.char_indices().last() {
        Some((i, 'd')) => (&s[..i], 24 * 60 * 60),
        Some((i, 'h')) => (&s[..i], 60 * 60),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 's')) => (&s[..i], 1),
        // Assume seconds
        _ => (s.as_str(), 1),
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration number: {}", num_str))?;

    Ok(Duration::from_secs(num * multiplier))
}
