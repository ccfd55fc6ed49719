//! workerlab configuration file loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use workerlab_core::coordinator::{RunConfig, RunCoordinator, DEFAULT_COMPATIBILITY_TAG};
use workerlab_core::provision::DEFAULT_MAX_SOURCE_BYTES;
use workerlab_sandbox::{DenoConfig, DenoSubstrate};

/// Top-level workerlab configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerlabConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Wall-clock budget per entrypoint call, in milliseconds.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    /// Max sandboxes alive at once while grading a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Compatibility date handed to every sandbox.
    #[serde(default = "default_compatibility_date")]
    pub compatibility_date: String,
    /// Submissions larger than this are rejected.
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
    #[serde(default)]
    pub sandbox: DenoConfig,
}

fn default_listen() -> String {
    "127.0.0.1:1337".to_string()
}
fn default_time_budget_ms() -> u64 {
    5000
}
fn default_parallelism() -> usize {
    4
}
fn default_compatibility_date() -> String {
    DEFAULT_COMPATIBILITY_TAG.to_string()
}
fn default_max_source_bytes() -> usize {
    DEFAULT_MAX_SOURCE_BYTES
}

impl Default for WorkerlabConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            time_budget_ms: default_time_budget_ms(),
            parallelism: default_parallelism(),
            compatibility_date: default_compatibility_date(),
            max_source_bytes: default_max_source_bytes(),
            sandbox: DenoConfig::default(),
        }
    }
}

impl WorkerlabConfig {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            time_budget: Duration::from_millis(self.time_budget_ms),
            parallelism: self.parallelism,
            compatibility_tag: self.compatibility_date.clone(),
            max_source_bytes: self.max_source_bytes,
        }
    }

    /// Build a coordinator backed by the Deno substrate.
    pub fn coordinator(&self) -> RunCoordinator {
        let substrate = Arc::new(DenoSubstrate::new(self.sandbox.clone()));
        RunCoordinator::new(substrate, self.run_config())
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        anyhow::ensure!(self.time_budget_ms > 0, "time_budget_ms must be positive");
        anyhow::ensure!(self.sandbox.max_heap_mb > 0, "sandbox.max_heap_mb must be positive");
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + len];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `--config <path>`
/// 2. `workerlab.toml` in the current directory
/// 3. `~/.config/workerlab/config.toml`
///
/// Environment variable overrides: `WORKERLAB_LISTEN`, `WORKERLAB_DENO`.
pub fn load_config_from(path: Option<&Path>) -> Result<WorkerlabConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("workerlab.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<WorkerlabConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => WorkerlabConfig::default(),
    };

    if let Ok(listen) = std::env::var("WORKERLAB_LISTEN") {
        config.listen = listen;
    }
    if let Ok(deno) = std::env::var("WORKERLAB_DENO") {
        config.sandbox.deno_path = PathBuf::from(deno);
    }

    config.listen = resolve_env_vars(&config.listen);
    config.compatibility_date = resolve_env_vars(&config.compatibility_date);
    config.sandbox.deno_path = resolve_path(&config.sandbox.deno_path);
    config.sandbox.scratch_root = config.sandbox.scratch_root.as_deref().map(resolve_path);

    config.validate()?;

    match &config_path {
        Some(path) => tracing::debug!("loaded config from {}", path.display()),
        None => tracing::debug!("no config file found, using defaults"),
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("workerlab"))
}
