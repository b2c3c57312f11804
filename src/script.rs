use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Fail with `Error::NotRoot` unless the effective user is root.
pub fn require_root(operation: &str) -> Result<()> {
    root_check(nix::unistd::geteuid().is_root(), operation)
}

fn root_check(is_root: bool, operation: &str) -> Result<()> {
    if is_root {
        Ok(())
    } else {
        Err(Error::NotRoot {
            operation: operation.to_string(),
        })
    }
}

/// The external program that persists a power mode selection.
#[derive(Debug, Clone)]
pub struct ModeScript {
    path: PathBuf,
}

impl ModeScript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the script as `<script> <default_id> <selected_id>` and wait for it.
    /// Returns its combined stdout and stderr, trimmed.
    pub fn apply(&self, default_id: &str, selected_id: &str) -> Result<String> {
        tracing::info!(
            script = %self.path.display(),
            default_id,
            selected_id,
            "applying power mode"
        );

        let output = Command::new(&self.path)
            .args([default_id, selected_id])
            .output()
            .map_err(|e| Error::ScriptSpawn {
                path: self.path.clone(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if !output.status.success() {
            return Err(Error::ScriptFailed {
                path: self.path.clone(),
                status: output.status,
                output: combined,
            });
        }

        Ok(combined)
    }
}
