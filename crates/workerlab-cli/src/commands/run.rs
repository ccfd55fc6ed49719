//! The `workerlab run` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use workerlab_core::model::{RequestSpec, RunOutcome, Submission};

use crate::config::load_config_from;

pub async fn execute(
    code_path: PathBuf,
    method: Option<String>,
    path: String,
    body: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let source = std::fs::read_to_string(&code_path)
        .with_context(|| format!("failed to read module: {}", code_path.display()))?;

    let request = RequestSpec { method, path, body };
    let result = config
        .coordinator()
        .execute(&Submission::new(source), &request)
        .await?;

    let outcome = RunOutcome::from(&result);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
