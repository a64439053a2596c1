// src/fetch.rs

//! Fetch executor: resolve and build a package with an external tool
//!
//! The engine only sees the [`Fetcher`] trait. [`NixFetcher`] is the
//! production implementation; it first asks the package set which version it
//! carries for the attribute and refuses to build on a mismatch.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Outcome of a successful fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Output path printed by the build step, if any
    pub store_path: Option<String>,
}

/// Something that can retrieve/build a package given its name and version
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `name` at exactly `version`
    async fn fetch(&self, name: &str, version: &str) -> Result<FetchReport>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Fetcher backed by `nix-instantiate` and `nix-build`
#[derive(Debug, Clone)]
pub struct NixFetcher {
    eval_command: Vec<String>,
    build_command: Vec<String>,
    nixpkgs: String,
}

impl Default for NixFetcher {
    fn default() -> Self {
        Self {
            eval_command: vec!["nix-instantiate".to_string()],
            build_command: vec!["nix-build".to_string()],
            nixpkgs: "<nixpkgs>".to_string(),
        }
    }
}

impl NixFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the evaluation command (program plus leading arguments)
    pub fn with_eval_command(mut self, argv: Vec<String>) -> Self {
        self.eval_command = argv;
        self
    }

    /// Override the build command (program plus leading arguments)
    pub fn with_build_command(mut self, argv: Vec<String>) -> Self {
        self.build_command = argv;
        self
    }

    /// Package set expression passed to both commands
    pub fn with_nixpkgs(mut self, nixpkgs: impl Into<String>) -> Self {
        self.nixpkgs = nixpkgs.into();
        self
    }

    /// Version the package set carries for attribute `name`
    async fn available_version(&self, name: &str) -> Result<Option<String>> {
        let attr = format!("{name}.version");
        let stdout = run(
            &self.eval_command,
            &["--eval", "--json", &self.nixpkgs, "-A", &attr],
        )
        .await?;

        match serde_json::from_str::<serde_json::Value>(stdout.trim()) {
            Ok(serde_json::Value::String(v)) => Ok(Some(v)),
            Ok(other) => {
                debug!("Non-string version for {}: {}", name, other);
                Ok(None)
            }
            Err(e) => Err(Error::Executor(format!(
                "could not parse version of {name}: {e}"
            ))),
        }
    }
}

#[async_trait]
impl Fetcher for NixFetcher {
    async fn fetch(&self, name: &str, version: &str) -> Result<FetchReport> {
        validate_attribute(name)?;
        info!("Starting download for {}...", name);

        if self.available_version(name).await?.as_deref() != Some(version) {
            return Err(Error::Executor(format!(
                "version {version} for {name} is not available"
            )));
        }

        let stdout = run(&self.build_command, &[&self.nixpkgs, "-A", name]).await?;
        let store_path = stdout.lines().last().map(|s| s.trim().to_string());
        info!(
            "Downloaded {} {} -> {}",
            name,
            version,
            store_path.as_deref().unwrap_or("(no output)")
        );

        Ok(FetchReport { store_path })
    }

    fn name(&self) -> &str {
        "nix"
    }
}

/// Reject attribute names that could be mistaken for options or paths
pub fn validate_attribute(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'));

    if valid {
        Ok(())
    } else {
        Err(Error::Executor(format!("invalid package attribute: {name:?}")))
    }
}

/// Run `argv` followed by `extra`, returning stdout on success
///
/// No shell is involved. The child is killed if the future is dropped, which
/// is how the engine's timeout reaches the process.
async fn run(argv: &[String], extra: &[&str]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Executor("empty command".to_string()))?;

    debug!("Executing: {} {:?} {:?}", program, args, extra);

    let output = Command::new(program)
        .args(args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::Executor(format!("failed to spawn '{program}': {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);

    for line in stderr.lines() {
        warn!("[{}] {}", program, line);
    }

    if output.status.success() {
        Ok(stdout)
    } else {
        let code = output.status.code().unwrap_or(-1);
        Err(Error::Executor(format!(
            "'{}' failed with exit code {}: {}",
            program,
            code,
            stderr.trim()
        )))
    }
}
