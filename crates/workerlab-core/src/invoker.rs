//! Execution invoker: call a sandboxed entrypoint within a time budget.
//!
//! The invoker never returns an error. Whatever the submitted code does,
//! the outcome is an [`ExecutionResult`].

use std::time::Duration;

use tokio::time::Instant;

use crate::model::{ExecutionResult, FailureKind};
use crate::provision::SandboxHandle;
use crate::synth::SyntheticRequest;

/// Default wall-clock budget for one invocation.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(5);

/// Longest failure message kept from a thrown value.
const MAX_FAILURE_MESSAGE_CHARS: usize = 2000;

/// Deliver `request` to the handle's entrypoint and capture the outcome.
///
/// Reading the response body is part of the entrypoint call, so a body
/// that never completes counts against the same budget. On timeout the
/// context is terminated before returning.
pub async fn invoke(
    handle: &mut SandboxHandle,
    request: &SyntheticRequest,
    budget: Duration,
) -> ExecutionResult {
    let start = Instant::now();
    let outcome = tokio::time::timeout(budget, handle.sandbox_mut().fetch(request)).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(response)) => {
            tracing::debug!(
                sandbox = %handle.id(),
                status = response.status,
                elapsed_ms,
                "entrypoint returned"
            );
            ExecutionResult::completed(response.status, response.body, elapsed_ms)
        }
        Ok(Err(e)) => {
            tracing::debug!(sandbox = %handle.id(), elapsed_ms, "entrypoint failed: {e}");
            ExecutionResult::failed(
                FailureKind::ExecutionError,
                sanitize(&e.message),
                elapsed_ms,
            )
        }
        Err(_) => {
            let budget_ms = budget.as_millis() as u64;
            tracing::info!(
                sandbox = %handle.id(),
                budget_ms,
                "entrypoint timed out, terminating sandbox"
            );
            handle.sandbox_mut().terminate().await;
            ExecutionResult::failed(
                FailureKind::Timeout,
                format!("handler did not respond within {budget_ms}ms"),
                budget_ms,
            )
        }
    }
}

/// Make a thrown value safe to display: no control characters, bounded length.
fn sanitize(message: &str) -> String {
    let cleaned: String = message
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    if cleaned.is_empty() {
        return "entrypoint failed without a message".to_string();
    }
    if cleaned.chars().count() > MAX_FAILURE_MESSAGE_CHARS {
        let head: String = cleaned.chars().take(MAX_FAILURE_MESSAGE_CHARS).collect();
        return format!("{head}...");
    }
    cleaned
}
