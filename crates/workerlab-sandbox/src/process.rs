//! A sandbox backed by one Deno child process.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use workerlab_core::error::{EntrypointError, SubstrateError};
use workerlab_core::ids::SandboxId;
use workerlab_core::synth::SyntheticRequest;
use workerlab_core::traits::{EntrypointResponse, Sandbox};

use crate::bootstrap::{parse_result, BootstrapEnv, BootstrapInput};
use crate::sandbox::Scratch;
use crate::DenoConfig;

/// Bytes of stderr kept for diagnosing a crashed runtime.
const STDERR_TAIL_BYTES: usize = 4096;

/// Worst-case JSON escaping of one body byte (`\u0001`).
const ESCAPED_BYTES_PER_BODY_BYTE: usize = 6;

/// Headroom on top of the escaped body for the JSON framing of the result.
const STDOUT_OVERHEAD_BYTES: usize = 64 * 1024;

/// One running Deno process waiting for its single request.
pub struct DenoSandbox {
    id: SandboxId,
    // Declared before `scratch` so the process dies before its files go away.
    child: Child,
    scratch: Scratch,
    marker: String,
    compatibility_tag: String,
    max_body_bytes: usize,
}

impl DenoSandbox {
    /// Write the module to a fresh scratch directory and start the runtime.
    pub(crate) fn spawn(
        config: &DenoConfig,
        id: &SandboxId,
        source_text: &str,
        compatibility_tag: &str,
    ) -> Result<Self, SubstrateError> {
        let scratch = Scratch::new(config.scratch_root.as_deref(), source_text)?;

        let mut cmd = Command::new(&config.deno_path);
        cmd.arg("run")
            .args(["--quiet", "--no-prompt", "--no-config", "--no-remote", "--no-npm"])
            .arg(format!("--allow-read={}", scratch.path().display()))
            .arg(format!("--v8-flags=--max-old-space-size={}", config.max_heap_mb))
            .arg(scratch.bootstrap_path())
            .current_dir(scratch.path())
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, val) in scratch.build_env() {
            cmd.env(&key, &val);
        }

        let child = cmd.spawn().map_err(|e| classify_spawn_error(&config.deno_path, e))?;

        Ok(Self {
            id: id.clone(),
            child,
            scratch,
            marker: format!("\u{1e}wl-{}:", uuid::Uuid::new_v4().simple()),
            compatibility_tag: compatibility_tag.to_string(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn deliver(&mut self, request: &SyntheticRequest) -> Result<(), EntrypointError> {
        let input = BootstrapInput {
            marker: &self.marker,
            request,
            env: BootstrapEnv {
                compatibility_date: &self.compatibility_tag,
            },
            max_body_bytes: self.max_body_bytes,
        };
        let payload = serde_json::to_vec(&input)
            .map_err(|e| EntrypointError::new(format!("failed to encode request: {e}")))?;

        let mut stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| EntrypointError::new("sandbox has already served a request"))?;

        // A broken pipe means the runtime already exited; its output says why.
        if let Err(e) = stdin.write_all(&payload).await {
            tracing::debug!(sandbox = %self.id, "failed to write request: {e}");
        }
        drop(stdin);
        Ok(())
    }
}

#[async_trait]
impl Sandbox for DenoSandbox {
    async fn fetch(
        &mut self,
        request: &SyntheticRequest,
    ) -> Result<EntrypointResponse, EntrypointError> {
        self.deliver(request).await?;

        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| EntrypointError::new("sandbox stdout unavailable"))?;
        let stderr = self.child.stderr.take();

        let limit = stdout_limit(self.max_body_bytes);
        let (stdout, stderr) = tokio::join!(
            read_limited(stdout, limit),
            read_tail(stderr, STDERR_TAIL_BYTES)
        );
        let stdout = stdout
            .map_err(|e| EntrypointError::new(format!("failed to read sandbox output: {e}")))?;

        if stdout.len() > limit {
            self.terminate().await;
            return Err(EntrypointError::new(format!(
                "sandbox output exceeded {limit} bytes"
            )));
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| EntrypointError::new(format!("failed to wait for sandbox: {e}")))?;

        let stdout = String::from_utf8_lossy(&stdout);
        match parse_result(&stdout, &self.marker) {
            Some(Ok(mut response)) => {
                truncate_body(&mut response.body, self.max_body_bytes);
                Ok(response)
            }
            Some(Err(e)) => Err(e),
            None => {
                let stderr = stderr.trim();
                tracing::debug!(sandbox = %self.id, %status, "sandbox exited without a result");
                Err(EntrypointError::new(if stderr.is_empty() {
                    format!("sandbox exited ({status}) without producing a response")
                } else {
                    format!("sandbox exited ({status}): {stderr}")
                }))
            }
        }
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(sandbox = %self.id, "kill failed, process likely exited: {e}");
        }
        tracing::debug!(
            sandbox = %self.id,
            dir = %self.scratch.path().display(),
            "sandbox terminated"
        );
    }
}

fn classify_spawn_error(program: &std::path::Path, e: std::io::Error) -> SubstrateError {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            SubstrateError::Unavailable(format!("cannot execute {}: {e}", program.display()))
        }
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::OutOfMemory => {
            SubstrateError::Exhausted(format!("cannot spawn {}: {e}", program.display()))
        }
        _ => SubstrateError::Io(e),
    }
}

/// Largest result line accepted for a body limit of `max_body_bytes`.
fn stdout_limit(max_body_bytes: usize) -> usize {
    max_body_bytes
        .saturating_mul(ESCAPED_BYTES_PER_BODY_BYTE)
        .saturating_add(STDOUT_OVERHEAD_BYTES)
}

/// Read at most `limit + 1` bytes so the caller can detect overflow.
async fn read_limited<R>(reader: R, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take((limit as u64).saturating_add(1)).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Drain a reader entirely, keeping only the last `keep` bytes.
async fn read_tail<R>(reader: Option<R>, keep: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut tail = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > keep {
                    tail.drain(..tail.len() - keep);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

/// Cut `body` to at most `max_bytes`, on a char boundary.
fn truncate_body(body: &mut String, max_bytes: usize) {
    if body.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
}
