//! Static validation of candidate code by byte-compiling it with the
//! configured interpreter.

use std::path::PathBuf;

use tracing::debug;

/// Result of a validation run. Failures carry the compiler diagnostic so
/// retry loops can feed it back into the next generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Passed,
    Failed(String),
}

impl Validation {
    pub fn passed(&self) -> bool {
        matches!(self, Validation::Passed)
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Validation::Passed => None,
            Validation::Failed(diag) => Some(diag),
        }
    }
}

/// Compiles a candidate source blob and reports pass/fail.
#[derive(Debug, Clone)]
pub struct CodeValidator {
    python_cmd: String,
}

impl CodeValidator {
    pub fn new(python_cmd: &str) -> Self {
        Self {
            python_cmd: python_cmd.to_string(),
        }
    }

    /// Byte-compile `code` via `<python> -m py_compile`. Inability to run
    /// the interpreter folds into a failed validation with a diagnostic,
    /// per the pipeline's propagation policy.
    pub async fn validate(&self, code: &str) -> Validation {
        let staging = scratch_path();
        if let Err(e) = tokio::fs::write(&staging, code).await {
            return Validation::Failed(format!(
                "Failed to stage code for validation at {}: {}",
                staging.display(),
                e
            ));
        }

        let result = tokio::process::Command::new(&self.python_cmd)
            .arg("-m")
            .arg("py_compile")
            .arg(&staging)
            .output()
            .await;

        let validation = match result {
            Ok(output) if output.status.success() => Validation::Passed,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let diag = if stderr.trim().is_empty() {
                    String::from_utf8_lossy(&output.stdout).trim().to_string()
                } else {
                    stderr.trim().to_string()
                };
                Validation::Failed(if diag.is_empty() {
                    "Compilation failed".to_string()
                } else {
                    diag
                })
            }
            Err(e) => Validation::Failed(format!(
                "Failed to run {}: {}",
                self.python_cmd, e
            )),
        };

        if let Err(e) = tokio::fs::remove_file(&staging).await {
            debug!(path = %staging.display(), error = %e, "failed to remove validation staging file");
        }

        validation
    }
}

fn scratch_path() -> PathBuf {
    std::env::temp_dir().join(format!("scenesmith_validate_{}.py", uuid::Uuid::new_v4()))
}
