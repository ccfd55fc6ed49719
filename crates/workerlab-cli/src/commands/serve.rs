//! The `workerlab serve` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use workerlab_server::AppState;

use crate::config::load_config_from;

pub async fn execute(listen: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let addr = listen.unwrap_or_else(|| config.listen.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        time_budget_ms = config.time_budget_ms,
        parallelism = config.parallelism,
        deno = %config.sandbox.deno_path.display(),
        "starting workerlab v{}",
        env!("CARGO_PKG_VERSION")
    );

    workerlab_server::serve(listener, AppState::new(config.coordinator())).await
}
