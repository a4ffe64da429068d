// SPDX-License-Identifier: Apache-2.0

//! Code execution hand-off.
//!
//! Resolves a caller-supplied name to `<name>.<extension>`, checks that it
//! exists, and runs it with the configured interpreter under the server's own privileges.
//! Names are not validated and paths are not confined: `../` and absolute
//! paths resolve wherever they point. Nothing else in the crate calls into
//! this module; the server reaches it from a single route.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{error, instrument, warn};

use crate::config::EscalationConfig;
use crate::error::LabError;

/// The three disjoint results of an execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file ran and exited successfully.
    Executed {
        /// Captured standard output.
        stdout: String,
    },
    /// No file at the resolved path.
    NotFound(PathBuf),
    /// The file exists but could not be read, spawned, or exited non-zero.
    RuntimeError(String),
}

/// Runs files with an interpreter.
#[derive(Debug, Clone)]
pub struct EscalationSink {
    interpreter: String,
    extension: String,
    root: PathBuf,
}

impl EscalationSink {
    /// Sink resolving names against the process working directory.
    #[must_use]
    pub fn new(config: &EscalationConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            extension: config.extension.clone(),
            root: PathBuf::from("."),
        }
    }

    /// Resolve names against `root` instead of the working directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Path a name resolves to. No normalization is applied.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{}", self.extension))
    }

    /// Resolve, check, and run `name`.
    #[instrument(skip(self), fields(interpreter = %self.interpreter))]
    pub async fn execute(&self, name: &str) -> Outcome {
        let path = self.resolve(name);

        match self.run(&path).await {
            Ok(stdout) => {
                warn!(path = %path.display(), "Executed file");
                Outcome::Executed { stdout }
            }
            Err(LabError::ResourceNotFound(path)) => {
                warn!(path = %path.display(), "Execution target not found");
                Outcome::NotFound(path)
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "Execution failed");
                Outcome::RuntimeError(err.to_string())
            }
        }
    }

    async fn run(&self, path: &Path) -> Result<String, LabError> {
        match tokio::fs::metadata(path).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LabError::ResourceNotFound(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        }

        let output = Command::new(&self.interpreter).arg(path).output().await?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            output.status.to_string()
        } else {
            format!("{stderr} ({})", output.status)
        };
        Err(LabError::Unexpected(message))
    }
}
