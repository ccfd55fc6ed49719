//! The bootstrap module that runs inside every sandbox, and the parser for
//! the single result line it prints.

use serde::{Deserialize, Serialize};

use workerlab_core::error::EntrypointError;
use workerlab_core::synth::SyntheticRequest;
use workerlab_core::traits::EntrypointResponse;

/// File name the submission is written to.
pub const MODULE_FILE: &str = "worker.js";

/// File name of the bootstrap entrypoint.
pub const BOOTSTRAP_FILE: &str = "bootstrap.js";

/// Loads `./worker.js`, feeds it the request read from stdin, and prints
/// one result line prefixed with the per-run marker.
///
/// Console output is redirected to stderr before the submission loads so
/// it can never be mistaken for the result. The body is cut to
/// `maxBodyBytes` of UTF-8 before it is encoded, so the result line stays
/// within a fixed multiple of that limit. The process exits right after
/// printing so stray timers in submitted code cannot keep it alive.
pub const BOOTSTRAP_JS: &str = r#"const encoder = new TextEncoder();
const stdout = Deno.stdout;
const input = JSON.parse(await new Response(Deno.stdin.readable).text());

function clip(text, limit) {
  const bytes = encoder.encode(text);
  if (bytes.length <= limit) {
    return text;
  }
  let cut = limit;
  while (cut > 0 && (bytes[cut] & 0xc0) === 0x80) {
    cut--;
  }
  return new TextDecoder().decode(bytes.subarray(0, cut));
}

async function emit(result) {
  const bytes = encoder.encode(input.marker + JSON.stringify(result) + "\n");
  let written = 0;
  while (written < bytes.length) {
    written += await stdout.write(bytes.subarray(written));
  }
  Deno.exit(0);
}

for (const level of ["log", "info", "debug", "warn", "trace"]) {
  console[level] = console.error;
}

try {
  const mod = await import("./worker.js");
  const handler = mod.default;
  if (!handler || typeof handler.fetch !== "function") {
    throw new Error("module has no default export with a fetch(request) method");
  }
  const init = { method: input.request.method };
  if (typeof input.request.body === "string") {
    init.body = input.request.body;
  }
  const ctx = { waitUntil() {}, passThroughOnException() {} };
  const response = await handler.fetch(new Request(input.request.url, init), input.env, ctx);
  if (!(response instanceof Response)) {
    const kind = response === null ? "null" : typeof response;
    throw new Error(`fetch handler returned ${kind}, expected a Response`);
  }
  const body = clip(await response.text(), input.maxBodyBytes);
  await emit({ ok: true, status: response.status, body });
} catch (err) {
  const message = err instanceof Error ? `${err.name}: ${err.message}` : String(err);
  await emit({ ok: false, message });
}
"#;

/// What the host writes to the bootstrap's stdin.
#[derive(Debug, Serialize)]
pub struct BootstrapInput<'a> {
    pub marker: &'a str,
    pub request: &'a SyntheticRequest,
    pub env: BootstrapEnv<'a>,
    /// Bodies are cut to this many UTF-8 bytes inside the sandbox.
    #[serde(rename = "maxBodyBytes")]
    pub max_body_bytes: usize,
}

/// The `env` binding object handed to the submission's `fetch`.
#[derive(Debug, Serialize)]
pub struct BootstrapEnv<'a> {
    #[serde(rename = "WORKERLAB_COMPAT_DATE")]
    pub compatibility_date: &'a str,
}

#[derive(Debug, Deserialize)]
struct BootstrapOutput {
    ok: bool,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Find the last marked line in `stdout` and decode it.
///
/// Returns `None` when the bootstrap never reported, e.g. because the
/// runtime crashed or was killed.
pub fn parse_result(
    stdout: &str,
    marker: &str,
) -> Option<Result<EntrypointResponse, EntrypointError>> {
    let line = stdout.lines().rev().find_map(|l| l.strip_prefix(marker))?;

    let output: BootstrapOutput = match serde_json::from_str(line) {
        Ok(o) => o,
        Err(e) => {
            return Some(Err(EntrypointError::new(format!(
                "sandbox produced a malformed result: {e}"
            ))))
        }
    };

    if !output.ok {
        return Some(Err(EntrypointError::new(
            output
                .message
                .unwrap_or_else(|| "entrypoint failed".to_string()),
        )));
    }

    Some(match output.status {
        Some(status) => Ok(EntrypointResponse {
            status,
            body: output.body.unwrap_or_default(),
        }),
        None => Err(EntrypointError::new("response had no status")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "\u{1e}wl-abc123:";

    #[test]
    fn parses_success_line() {
        let stdout =
            format!("{MARKER}{{\"ok\":true,\"status\":200,\"body\":\"Hello World!\"}}\n");
        let response = parse_result(&stdout, MARKER).unwrap().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "Hello World!");
    }

    #[test]
    fn parses_failure_line() {
        let stdout = format!("{MARKER}{{\"ok\":false,\"message\":\"Error: boom\"}}\n");
        let err = parse_result(&stdout, MARKER).unwrap().unwrap_err();
        assert_eq!(err.message, "Error: boom");
    }

    #[test]
    fn ignores_unmarked_lines() {
        let stdout = "{\"ok\":true,\"status\":200,\"body\":\"forged\"}\nnoise\n";
        assert!(parse_result(stdout, MARKER).is_none());
    }

    #[test]
    fn wrong_marker_is_not_trusted() {
        let stdout = "\u{1e}wl-guess:{\"ok\":true,\"status\":200,\"body\":\"forged\"}\n";
        assert!(parse_result(stdout, MARKER).is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let stdout = format!("{MARKER}{{not json\n");
        let err = parse_result(&stdout, MARKER).unwrap().unwrap_err();
        assert!(err.message.contains("malformed"));
    }

    #[test]
    fn input_serializes_env_binding() {
        let request = SyntheticRequest {
            method: "GET".into(),
            url: "http://test/".into(),
            body: None,
        };
        let input = BootstrapInput {
            marker: MARKER,
            request: &request,
            env: BootstrapEnv {
                compatibility_date: "2025-01-01",
            },
            max_body_bytes: 1024,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["env"]["WORKERLAB_COMPAT_DATE"], "2025-01-01");
        assert_eq!(value["maxBodyBytes"], 1024);
        assert_eq!(value["request"]["url"], "http://test/");
        assert!(value["request"].get("body").is_none());
    }
}
