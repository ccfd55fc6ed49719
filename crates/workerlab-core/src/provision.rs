//! Sandbox provisioning: validate a submission and allocate a fresh context.

use std::sync::Arc;

use crate::error::{HarnessError, SubstrateError};
use crate::ids::{IdGenerator, SandboxId};
use crate::traits::{IsolationSubstrate, ModuleSpec, Sandbox};

/// Default upper bound on submission size.
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 256 * 1024;

/// A single-use handle to one provisioned execution context.
///
/// Dropping the handle releases the context.
pub struct SandboxHandle {
    id: SandboxId,
    sandbox: Box<dyn Sandbox>,
}

impl SandboxHandle {
    pub fn id(&self) -> &SandboxId {
        &self.id
    }

    pub(crate) fn sandbox_mut(&mut self) -> &mut dyn Sandbox {
        self.sandbox.as_mut()
    }
}

impl std::fmt::Debug for SandboxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxHandle").field("id", &self.id).finish()
    }
}

/// Owns the substrate and the id generator; mints one handle per call.
pub struct Provisioner {
    substrate: Arc<dyn IsolationSubstrate>,
    ids: IdGenerator,
    max_source_bytes: usize,
}

impl Provisioner {
    pub fn new(substrate: Arc<dyn IsolationSubstrate>) -> Self {
        Self {
            substrate,
            ids: IdGenerator::new(),
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
        }
    }

    pub fn with_max_source_bytes(mut self, max_source_bytes: usize) -> Self {
        self.max_source_bytes = max_source_bytes;
        self
    }

    pub fn substrate_name(&self) -> &str {
        self.substrate.name()
    }

    /// Reject submissions that cannot possibly load, before allocating anything.
    pub fn validate(&self, source_text: &str) -> Result<(), HarnessError> {
        if source_text.trim().is_empty() {
            return Err(HarnessError::InvalidSubmission(
                "code must be a non-empty string".into(),
            ));
        }
        if source_text.len() > self.max_source_bytes {
            return Err(HarnessError::InvalidSubmission(format!(
                "code is {} bytes, limit is {}",
                source_text.len(),
                self.max_source_bytes
            )));
        }
        Ok(())
    }

    /// Allocate a new isolated context running `source_text`.
    ///
    /// A transient substrate failure is retried exactly once, under a
    /// freshly minted id.
    pub async fn provision(
        &self,
        source_text: &str,
        compatibility_tag: &str,
    ) -> Result<SandboxHandle, HarnessError> {
        self.validate(source_text)?;

        match self.load(source_text, compatibility_tag).await {
            Ok(handle) => Ok(handle),
            Err(e) if e.is_transient() => {
                tracing::warn!("sandbox allocation failed, retrying once: {e}");
                self.load(source_text, compatibility_tag)
                    .await
                    .map_err(|e| HarnessError::ProvisionFailed(e.to_string()))
            }
            Err(e) => Err(HarnessError::ProvisionFailed(e.to_string())),
        }
    }

    async fn load(
        &self,
        source_text: &str,
        compatibility_tag: &str,
    ) -> Result<SandboxHandle, SubstrateError> {
        let id = self.ids.next_id();
        let sandbox = self
            .substrate
            .load(ModuleSpec {
                id: &id,
                source_text,
                compatibility_tag,
            })
            .await?;
        tracing::debug!(sandbox = %id, substrate = self.substrate.name(), "sandbox provisioned");
        Ok(SandboxHandle { id, sandbox })
    }
}
