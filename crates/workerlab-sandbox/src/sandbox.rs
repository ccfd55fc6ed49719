//! Private scratch directory holding one submission and its bootstrap.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::bootstrap::{BOOTSTRAP_FILE, BOOTSTRAP_JS, MODULE_FILE};

/// A scratch directory owned by exactly one sandbox.
///
/// On drop, the temporary directory is automatically cleaned up.
pub struct Scratch {
    /// Temporary directory containing the module files.
    dir: TempDir,
}

impl Scratch {
    /// Create a new scratch directory containing `source_text` and the bootstrap.
    pub fn new(root: Option<&Path>, source_text: &str) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("workerlab-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        std::fs::write(dir.path().join(MODULE_FILE), source_text)?;
        std::fs::write(dir.path().join(BOOTSTRAP_FILE), BOOTSTRAP_JS)?;
        std::fs::create_dir_all(dir.path().join(".deno"))?;

        Ok(Self { dir })
    }

    /// Get the path to the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bootstrap_path(&self) -> PathBuf {
        self.dir.path().join(BOOTSTRAP_FILE)
    }

    /// Runtime cache directory, private to this sandbox.
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join(".deno")
    }

    /// Build the complete environment for the sandboxed process.
    ///
    /// The child starts from an empty environment, so nothing from the
    /// host (credentials, sockets, tokens) is inherited.
    pub fn build_env(&self) -> Vec<(String, String)> {
        vec![
            (
                "DENO_DIR".to_string(),
                self.cache_dir().to_string_lossy().to_string(),
            ),
            ("DENO_NO_UPDATE_CHECK".to_string(), "1".to_string()),
            ("DENO_NO_PROMPT".to_string(), "1".to_string()),
            ("NO_COLOR".to_string(), "1".to_string()),
        ]
    }
}
