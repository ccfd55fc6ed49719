//! workerlab-sandbox: Process-isolated sandboxes backed by Deno.
//!
//! Every sandbox is a separate `deno` process with its own scratch
//! directory, an empty environment, read access to that directory only,
//! and no network, subprocess, or write permissions.

pub mod bootstrap;
pub mod process;
pub mod sandbox;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use workerlab_core::error::SubstrateError;
use workerlab_core::traits::{IsolationSubstrate, ModuleSpec, Sandbox};

pub use process::DenoSandbox;

/// Settings for the Deno substrate, read from the `[sandbox]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DenoConfig {
    /// Path to the `deno` executable.
    pub deno_path: PathBuf,
    /// V8 old-space limit per sandbox, in megabytes.
    pub max_heap_mb: u32,
    /// Response bodies are cut to this many bytes.
    pub max_body_bytes: usize,
    /// Where scratch directories are created (system temp dir if unset).
    pub scratch_root: Option<PathBuf>,
}

impl Default for DenoConfig {
    fn default() -> Self {
        Self {
            deno_path: PathBuf::from("deno"),
            max_heap_mb: 128,
            max_body_bytes: 1024 * 1024,
            scratch_root: None,
        }
    }
}

/// Isolation substrate that spawns one Deno process per sandbox.
pub struct DenoSubstrate {
    config: DenoConfig,
}

impl DenoSubstrate {
    pub fn new(config: DenoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DenoConfig {
        &self.config
    }
}

impl Default for DenoSubstrate {
    fn default() -> Self {
        Self::new(DenoConfig::default())
    }
}

#[async_trait]
impl IsolationSubstrate for DenoSubstrate {
    fn name(&self) -> &str {
        "deno"
    }

    async fn load(&self, module: ModuleSpec<'_>) -> Result<Box<dyn Sandbox>, SubstrateError> {
        let sandbox = DenoSandbox::spawn(
            &self.config,
            module.id,
            module.source_text,
            module.compatibility_tag,
        )?;
        tracing::debug!(sandbox = %module.id, "deno sandbox spawned");
        Ok(Box::new(sandbox))
    }
}
