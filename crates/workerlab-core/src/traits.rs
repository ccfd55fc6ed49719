//! Core trait definitions for isolation substrates.
//!
//! The run pipeline only depends on these seams. `workerlab-sandbox`
//! provides the process-backed implementation; tests use
//! [`MockSubstrate`](crate::mock::MockSubstrate).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EntrypointError, SubstrateError};
use crate::ids::SandboxId;
use crate::synth::SyntheticRequest;

// ---------------------------------------------------------------------------
// Isolation substrate
// ---------------------------------------------------------------------------

/// A mechanism that can load source text into a fresh isolated context.
#[async_trait]
pub trait IsolationSubstrate: Send + Sync {
    /// Human-readable substrate name (e.g. "deno").
    fn name(&self) -> &str;

    /// Allocate a new context whose code is exactly `module.source_text`.
    ///
    /// Implementations must never hand back a context that has served a
    /// different id.
    async fn load(&self, module: ModuleSpec<'_>) -> Result<Box<dyn Sandbox>, SubstrateError>;
}

/// Everything a substrate needs to build one context.
#[derive(Debug, Clone, Copy)]
pub struct ModuleSpec<'a> {
    pub id: &'a SandboxId,
    pub source_text: &'a str,
    pub compatibility_tag: &'a str,
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// One live execution context. Its only capability is the entrypoint call.
#[async_trait]
pub trait Sandbox: Send {
    /// Deliver a request to the entrypoint and wait for its response.
    async fn fetch(
        &mut self,
        request: &SyntheticRequest,
    ) -> Result<EntrypointResponse, EntrypointError>;

    /// Forcibly stop the context. Must not block on the submitted code.
    async fn terminate(&mut self);
}

/// The response-like value an entrypoint returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointResponse {
    pub status: u16,
    pub body: String,
}
