//! Infrastructure provisioning tool
//!
//! Wraps the command-line tool that renders deployment templates and
//! manages the underlying cloud resource stacks. Subcommands used here:
//! render, create, patch, respawn-instances, domains, traffic, remove,
//! list. Structured output is requested as JSON.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::process::Command;

use strato_core::domain::stack::Stack;

use crate::tool::{ToolError, parse_json, run};

/// Operations the orchestration layer needs from the provisioning tool.
///
/// Every call is blocking and single-shot; the implementation decides how
/// the operation is carried out.
pub trait ProvisionTool: Send + Sync {
    /// Renders a deployment template into a resolved resource definition.
    fn render(
        &self,
        template: &str,
        version: &str,
        application_version: Option<&str>,
        parameters: &[String],
    ) -> Result<JsonValue, ToolError>;

    /// Creates a new stack from a template.
    fn create(
        &self,
        template: &str,
        version: &str,
        image_version: &str,
        parameters: &[String],
        disable_rollback: bool,
        tags: &[(String, String)],
    ) -> Result<(), ToolError>;

    /// Changes the machine image of the stack's scaling group.
    fn patch_image(&self, name: &str, version: &str, image: &str) -> Result<(), ToolError>;

    /// Rolls the stack's instances so they pick up a patched image.
    fn respawn_instances(&self, name: &str, version: &str) -> Result<(), ToolError>;

    /// Queries the routing domains configured for an application.
    fn domains(&self, name: &str) -> Result<Vec<DomainRecord>, ToolError>;

    /// Reassigns the given traffic percentage to a stack version.
    fn switch_traffic(&self, name: &str, version: &str, percentage: u8) -> Result<(), ToolError>;

    /// Removes a stack and its underlying infrastructure.
    fn remove(&self, name: &str, version: &str) -> Result<(), ToolError>;

    /// Lists deployed stacks, optionally filtered by application name.
    fn list(&self, name: Option<&str>) -> Result<Vec<StackRecord>, ToolError>;
}

/// A deployed stack as serialized by the tool's list output.
#[derive(Debug, Clone, Deserialize)]
pub struct StackRecord {
    pub stack_name: String,
    pub version: String,
    pub status: String,
    /// Creation instant as epoch seconds.
    pub creation_time: f64,
    #[serde(default)]
    pub image_version: Option<String>,
    #[serde(default)]
    pub application_version: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub disable_rollback: bool,
    #[serde(default)]
    pub target_traffic: Option<u8>,
    #[serde(default)]
    pub keep_stacks: Option<u32>,
}

impl StackRecord {
    /// Maps the platform record into the domain entity.
    pub fn into_stack(self) -> Stack {
        let secs = self.creation_time.trunc() as i64;
        let nanos = (self.creation_time.fract() * 1e9) as u32;
        let creation_time = DateTime::from_timestamp(secs, nanos).unwrap_or(DateTime::UNIX_EPOCH);

        Stack {
            stack_name: self.stack_name,
            version: self.version,
            status: self.status,
            creation_time,
            image_version: self.image_version,
            application_version: self.application_version,
            parameters: self.parameters,
            disable_rollback: self.disable_rollback,
            target_traffic: self.target_traffic,
            keep_stacks: self.keep_stacks,
        }
    }
}

/// One routing domain entry from the tool's domains output.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Command-line implementation of [`ProvisionTool`].
pub struct CliProvisioner {
    bin: String,
    region: String,
}

impl CliProvisioner {
    pub fn new(bin: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            region: region.into(),
        }
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.bin);
        command.arg("--region").arg(&self.region);
        command
    }

    /// Writes template text to a temp file so it can be passed by path.
    fn template_file(&self, template: &str) -> Result<tempfile::NamedTempFile, ToolError> {
        let mut file = tempfile::NamedTempFile::new()
            .map_err(|err| ToolError::new(format!("failed to stage template: {err}"), ""))?;
        file.write_all(template.as_bytes())
            .map_err(|err| ToolError::new(format!("failed to stage template: {err}"), ""))?;
        Ok(file)
    }
}

impl ProvisionTool for CliProvisioner {
    fn render(
        &self,
        template: &str,
        version: &str,
        application_version: Option<&str>,
        parameters: &[String],
    ) -> Result<JsonValue, ToolError> {
        let file = self.template_file(template)?;

        let mut command = self.base_command();
        command
            .arg("render")
            .arg(file.path())
            .arg(version)
            .arg("--output")
            .arg("json");
        if let Some(application_version) = application_version {
            command.arg("--application-version").arg(application_version);
        }
        command.args(parameters);

        let stdout = run("render", &mut command)?;
        parse_json("render", &stdout)
    }

    fn create(
        &self,
        template: &str,
        version: &str,
        image_version: &str,
        parameters: &[String],
        disable_rollback: bool,
        tags: &[(String, String)],
    ) -> Result<(), ToolError> {
        let file = self.template_file(template)?;

        let mut command = self.base_command();
        command
            .arg("create")
            .arg(file.path())
            .arg(version)
            .arg(image_version);
        if disable_rollback {
            command.arg("--disable-rollback");
        }
        for (key, value) in tags {
            command.arg("--tag").arg(format!("{key}={value}"));
        }
        command.args(parameters);

        run("create", &mut command)?;
        Ok(())
    }

    fn patch_image(&self, name: &str, version: &str, image: &str) -> Result<(), ToolError> {
        let mut command = self.base_command();
        command
            .arg("patch")
            .arg(name)
            .arg(version)
            .arg("--image")
            .arg(image);

        run("patch", &mut command)?;
        Ok(())
    }

    fn respawn_instances(&self, name: &str, version: &str) -> Result<(), ToolError> {
        let mut command = self.base_command();
        command.arg("respawn-instances").arg(name).arg(version);

        run("respawn-instances", &mut command)?;
        Ok(())
    }

    fn domains(&self, name: &str) -> Result<Vec<DomainRecord>, ToolError> {
        let mut command = self.base_command();
        command
            .arg("domains")
            .arg(name)
            .arg("--output")
            .arg("json");

        let stdout = run("domains", &mut command)?;
        parse_json("domains", &stdout)
    }

    fn switch_traffic(&self, name: &str, version: &str, percentage: u8) -> Result<(), ToolError> {
        let mut command = self.base_command();
        command
            .arg("traffic")
            .arg(name)
            .arg(version)
            .arg(percentage.to_string());

        run("traffic", &mut command)?;
        Ok(())
    }

    fn remove(&self, name: &str, version: &str) -> Result<(), ToolError> {
        let mut command = self.base_command();
        command.arg("remove").arg(name).arg(version);

        run("remove", &mut command)?;
        Ok(())
    }

    fn list(&self, name: Option<&str>) -> Result<Vec<StackRecord>, ToolError> {
        let mut command = self.base_command();
        command.arg("list");
        if let Some(name) = name {
            command.arg(name);
        }
        command.arg("--output").arg("json");

        let stdout = run("list", &mut command)?;
        parse_json("list", &stdout)
    }
}
