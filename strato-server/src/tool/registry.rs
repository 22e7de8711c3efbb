//! Artifact registry tool
//!
//! Wraps the command-line tool that records deployed application versions
//! in the artifact registry. Callers treat registration as best-effort;
//! this module only reports whether the call succeeded.

use std::process::Command;

use crate::tool::{ToolError, run};

/// Registration operations the creation flow needs.
pub trait ArtifactRegistry: Send + Sync {
    /// Registers an application version and its build artifact.
    fn create_version(
        &self,
        application_id: &str,
        version: &str,
        artifact: &str,
    ) -> Result<(), ToolError>;
}

/// Command-line implementation of [`ArtifactRegistry`].
pub struct CliArtifactRegistry {
    bin: String,
}

impl CliArtifactRegistry {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl ArtifactRegistry for CliArtifactRegistry {
    fn create_version(
        &self,
        application_id: &str,
        version: &str,
        artifact: &str,
    ) -> Result<(), ToolError> {
        let mut command = Command::new(&self.bin);
        command
            .arg("versions")
            .arg("create")
            .arg(application_id)
            .arg(version)
            .arg(artifact);

        run("versions create", &mut command)?;
        Ok(())
    }
}
