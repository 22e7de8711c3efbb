//! Definition rendering
//!
//! Turns a deployment template into a resolved resource definition via the
//! provisioning tool, then extracts the stack name and the deployable
//! artifact from it. The rendered definition is transient; it only exists
//! long enough for stack creation to read those two values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::tool::ProvisionTool;

/// Resource type whose bootstrap payload names the deployable artifact.
pub const LAUNCH_CONFIG_TYPE: &str = "AWS::AutoScaling::LaunchConfiguration";

/// Rendering failures
///
/// A template the tool itself rejects (`InvalidTemplate`) is a different
/// failure from a structurally valid one missing a semantically required
/// piece (`MissingComponent`, `MissingProperty`, `MalformedPayload`).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering tool rejected the template; message verbatim.
    #[error("{0}")]
    InvalidTemplate(String),

    /// No resource of the required component type exists.
    #[error("Missing component type {0}")]
    MissingComponent(&'static str),

    /// A required key is absent from the rendered definition.
    #[error("Missing property in rendered definition: {0}")]
    MissingProperty(String),

    /// A present key holds a payload that cannot be decoded.
    #[error("Malformed {0} in rendered definition: {1}")]
    MalformedPayload(&'static str, String),
}

/// Typed view over the tool's resolved resource definition.
#[derive(Debug)]
pub struct RenderedDefinition {
    pub stack_name: String,
    pub resources: BTreeMap<String, ResourceDef>,
}

/// One resource entry: its type plus raw properties.
#[derive(Debug)]
pub struct ResourceDef {
    pub kind: String,
    pub properties: JsonValue,
}

impl RenderedDefinition {
    /// Builds the typed view, failing fast with the name of any absent key.
    pub fn from_json(raw: &JsonValue) -> Result<Self, RenderError> {
        let stack_name = raw
            .get("StackName")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| RenderError::MissingProperty("StackName".to_string()))?
            .to_string();

        let raw_resources = raw
            .get("Resources")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| RenderError::MissingProperty("Resources".to_string()))?;

        let mut resources = BTreeMap::new();
        for (name, resource) in raw_resources {
            let kind = resource
                .get("Type")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    RenderError::MissingProperty(format!("Resources.{name}.Type"))
                })?
                .to_string();
            let properties = resource.get("Properties").cloned().unwrap_or(JsonValue::Null);
            resources.insert(name.clone(), ResourceDef { kind, properties });
        }

        Ok(Self {
            stack_name,
            resources,
        })
    }

    /// Reads the deployable artifact named by the launch configuration's
    /// bootstrap payload (base64-encoded YAML, `source` field).
    pub fn artifact_source(&self) -> Result<String, RenderError> {
        let launch_config = self
            .resources
            .values()
            .find(|resource| resource.kind == LAUNCH_CONFIG_TYPE)
            .ok_or(RenderError::MissingComponent(LAUNCH_CONFIG_TYPE))?;

        let user_data = launch_config
            .properties
            .get("UserData")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| RenderError::MissingProperty("UserData".to_string()))?;

        let decoded = BASE64
            .decode(user_data)
            .map_err(|err| RenderError::MalformedPayload("UserData", err.to_string()))?;

        let bootstrap: serde_yaml::Value = serde_yaml::from_slice(&decoded)
            .map_err(|err| RenderError::MalformedPayload("UserData", err.to_string()))?;

        bootstrap
            .get("source")
            .and_then(serde_yaml::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RenderError::MissingProperty("source".to_string()))
    }
}

/// Renders a template through the provisioning tool into the typed view.
pub fn render_definition(
    tool: &dyn ProvisionTool,
    template: &str,
    version: &str,
    application_version: Option<&str>,
    parameters: &[String],
) -> Result<RenderedDefinition, RenderError> {
    let raw = tool
        .render(template, version, application_version, parameters)
        .map_err(|err| RenderError::InvalidTemplate(err.message))?;

    RenderedDefinition::from_json(&raw)
}
