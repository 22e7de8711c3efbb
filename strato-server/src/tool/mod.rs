//! External tool invocation
//!
//! The provisioning and artifact-registry tools are out-of-process
//! command-line collaborators. Every invocation is a blocking, single-shot
//! call: stdout and stderr are captured, a non-zero exit becomes a
//! [`ToolError`], and nothing is retried here.

use std::process::Command;
use thiserror::Error;
use tracing::debug;

pub mod provision;
pub mod registry;

pub use provision::{CliProvisioner, DomainRecord, ProvisionTool, StackRecord};
pub use registry::{ArtifactRegistry, CliArtifactRegistry};

/// Failed tool invocation
///
/// `message` is the short diagnostic (trimmed stderr, stdout as fallback);
/// `output` is the full combined stdout+stderr for callers that need the
/// whole trace.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
    pub output: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: output.into(),
        }
    }
}

/// Runs a prepared command to completion and returns its stdout.
///
/// `label` names the operation in logs and failure messages.
pub(crate) fn run(label: &str, command: &mut Command) -> Result<String, ToolError> {
    let output = command
        .output()
        .map_err(|err| ToolError::new(format!("failed to execute {label}: {err}"), String::new()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", label, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", label, stderr.trim());
    }

    if !output.status.success() {
        let exit_code = output.status.code().unwrap_or(-1);
        debug!("{} failed with exit code {}", label, exit_code);

        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        let message = if message.is_empty() {
            format!("{label} failed with exit code {exit_code}")
        } else {
            message
        };

        let combined = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
            (false, false) => format!("{stdout}\n{stderr}"),
            (false, true) => stdout,
            (true, false) => stderr,
            (true, true) => String::new(),
        };

        return Err(ToolError::new(message, combined));
    }

    Ok(stdout)
}

/// Parses a tool's JSON stdout into the expected shape.
pub(crate) fn parse_json<T>(label: &str, stdout: &str) -> Result<T, ToolError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(stdout.trim())
        .map_err(|err| ToolError::new(format!("unparseable {label} output: {err}"), stdout))
}
