//! Stack lifecycle orchestration
//!
//! Create, patch, delete, and read deployed stacks. Every mutation goes
//! through the provisioning tool and the post-mutation view is re-fetched
//! from the platform, which stays the single source of truth.

use thiserror::Error;
use tracing::{error, info, warn};

use strato_core::domain::stack::{Stack, StackId};
use strato_core::dto::stack::{CreateStack, PatchStack};

use crate::service::render::{self, RenderError};
use crate::tool::{ArtifactRegistry, ProvisionTool, StackRecord};

/// Tag carrying the stack-retention count for out-of-band reconciliation.
const KEEP_STACKS_TAG: &str = "StratoKeepStacks";
/// Tag carrying the traffic percentage the stack should eventually receive.
const TARGET_TRAFFIC_TAG: &str = "StratoTargetTraffic";

/// Service error type
#[derive(Debug, Error)]
pub enum StackError {
    /// The rendering tool rejected the deployment template.
    #[error("{0}")]
    InvalidTemplate(String),

    /// Structurally valid template without the required component.
    #[error("{0}")]
    MissingComponent(String),

    /// Required key absent from the rendered definition.
    #[error("{0}")]
    MalformedTemplate(String),

    /// The infrastructure creation call failed; the tool's diagnostics are
    /// not assumed parseable, so the message stays generic.
    #[error("Stack creation command failed.")]
    DeploymentFailed,

    /// The image swap or instance respawn failed; remaining patch steps
    /// are suppressed.
    #[error("{0}")]
    ImageUpdateFailed(String),

    /// The application has no routing domain, so a traffic change has no
    /// meaning. Not a tool error.
    #[error("App does not have a domain.")]
    TrafficNotUpdated,

    /// Domain lookup or traffic reassignment failed.
    #[error("{0}")]
    TrafficUpdateFailed(String),

    /// Stack removal failed; carries the tool's full raw output.
    #[error("Stack deletion failed: {output}")]
    DeletionFailed { output: String },

    /// The identifier does not resolve to a known stack.
    #[error("Stack not found: {0}")]
    NotFound(String),

    /// A read of current platform state failed.
    #[error("{0}")]
    QueryFailed(String),
}

impl From<RenderError> for StackError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidTemplate(message) => StackError::InvalidTemplate(message),
            missing @ RenderError::MissingComponent(_) => {
                StackError::MissingComponent(missing.to_string())
            }
            malformed => StackError::MalformedTemplate(malformed.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;

/// Lists all deployed stacks, ordered by ascending creation time.
pub fn all_stacks(tool: &dyn ProvisionTool) -> Result<Vec<Stack>> {
    let records = tool
        .list(None)
        .map_err(|err| StackError::QueryFailed(err.message))?;

    let mut stacks: Vec<Stack> = records.into_iter().map(StackRecord::into_stack).collect();
    stacks.sort_by_key(|stack| stack.creation_time);
    Ok(stacks)
}

/// Gets one stack by its composite identifier.
pub fn get_stack(tool: &dyn ProvisionTool, stack_id: &str) -> Result<Stack> {
    let id = parse_id(stack_id)?;
    fetch_stack(tool, &id)
}

/// Creates a new stack.
///
/// Sequence: render the template, register the application version
/// (best-effort), invoke the create call, then re-fetch the stack as the
/// platform reports it. A render failure aborts before anything runs.
pub fn create_stack(
    tool: &dyn ProvisionTool,
    registry: &dyn ArtifactRegistry,
    request: CreateStack,
) -> Result<Stack> {
    let definition = render::render_definition(
        tool,
        &request.template,
        &request.stack_version,
        request.application_version.as_deref(),
        &request.parameters,
    )?;
    let artifact = definition.artifact_source()?;
    let stack_name = definition.stack_name;

    info!("Creating stack {}-{}...", stack_name, request.stack_version);

    if let Some(application_version) = &request.application_version {
        info!(
            "Registering version {} of {} in the artifact registry...",
            application_version, stack_name
        );
        match registry.create_version(&stack_name, application_version, &artifact) {
            Ok(()) => info!("Version registered for {}.", stack_name),
            // Registration is advisory bookkeeping; the infrastructure
            // change below stays the authoritative action.
            Err(err) => warn!(
                "Error registering version {} of {}: {}",
                application_version, stack_name, err.message
            ),
        }
    }

    let tags = vec![
        (KEEP_STACKS_TAG.to_string(), request.keep_stacks.to_string()),
        (
            TARGET_TRAFFIC_TAG.to_string(),
            request.new_traffic.to_string(),
        ),
    ];
    if let Err(err) = tool.create(
        &request.template,
        &request.stack_version,
        &request.image_version,
        &request.parameters,
        request.disable_rollback,
        &tags,
    ) {
        error!(
            "Error creating stack {}-{}: {}",
            stack_name, request.stack_version, err.message
        );
        return Err(StackError::DeploymentFailed);
    }

    info!("Stack {}-{} created.", stack_name, request.stack_version);

    // Creation is still in progress on the platform side; return the state
    // it reports now instead of synthesizing one from the request.
    fetch_stack(tool, &StackId::new(stack_name, request.stack_version))
}

/// Patches an existing stack: image update and/or traffic change.
///
/// The two operations are independent but order-dependent; an image-update
/// failure suppresses the traffic step because the intermediate cloud
/// state is unverified. The post-patch state is always re-fetched.
pub fn patch_stack(tool: &dyn ProvisionTool, stack_id: &str, patch: PatchStack) -> Result<Stack> {
    let id = parse_id(stack_id)?;
    fetch_stack(tool, &id)?;

    let patch = patch.filtered();

    if let Some(image) = &patch.new_ami_image {
        // Swap the scaling group's machine image, then roll the instances
        // so they come back up on it.
        let result = tool
            .patch_image(&id.name, &id.version, image)
            .and_then(|_| tool.respawn_instances(&id.name, &id.version));
        if let Err(err) = result {
            info!("Image update failed for stack {}: {}", id, err.message);
            return Err(StackError::ImageUpdateFailed(err.message));
        }
    }

    if let Some(percentage) = patch.new_traffic {
        let domains = tool.domains(&id.name).map_err(|err| {
            error!(
                "Failed to get domains for {}. Traffic will not be switched.",
                id.name
            );
            StackError::TrafficUpdateFailed(err.message)
        })?;

        if domains.is_empty() {
            info!(
                "App {} does not have a domain so traffic will not be switched.",
                id.name
            );
            return Err(StackError::TrafficNotUpdated);
        }

        info!("Switching app traffic to stack {}.", id);
        tool.switch_traffic(&id.name, &id.version, percentage)
            .map_err(|err| {
                error!("Failed to switch app traffic to stack {}.", id);
                StackError::TrafficUpdateFailed(err.message)
            })?;
    }

    // Whatever ran above, the authoritative post-patch view comes from the
    // platform, not from local assumptions.
    fetch_stack(tool, &id)
}

/// Deletes a stack and its underlying infrastructure.
pub fn delete_stack(tool: &dyn ProvisionTool, stack_id: &str) -> Result<()> {
    let id = parse_id(stack_id)?;

    info!("Removing stack {}...", id);
    if let Err(err) = tool.remove(&id.name, &id.version) {
        error!("Failed to remove stack {}: {}", id, err.message);
        // Deletion diagnostics are typically multi-line; surface the whole
        // trace rather than one message.
        return Err(StackError::DeletionFailed { output: err.output });
    }

    info!("Stack {} removed.", id);
    Ok(())
}

fn parse_id(stack_id: &str) -> Result<StackId> {
    StackId::parse(stack_id).ok_or_else(|| StackError::NotFound(stack_id.to_string()))
}

/// Fresh platform query for one stack; never served from local state.
fn fetch_stack(tool: &dyn ProvisionTool, id: &StackId) -> Result<Stack> {
    let records = tool
        .list(Some(&id.name))
        .map_err(|err| StackError::QueryFailed(err.message))?;

    records
        .into_iter()
        .find(|record| record.stack_name == id.name && record.version == id.version)
        .map(StackRecord::into_stack)
        .ok_or_else(|| StackError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{DomainRecord, ToolError};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::{Value as JsonValue, json};
    use std::sync::Mutex;

    fn record(name: &str, version: &str, creation_time: f64) -> StackRecord {
        StackRecord {
            stack_name: name.to_string(),
            version: version.to_string(),
            status: "CREATE_IN_PROGRESS".to_string(),
            creation_time,
            image_version: None,
            application_version: None,
            parameters: vec![],
            disable_rollback: false,
            target_traffic: None,
            keep_stacks: None,
        }
    }

    fn rendered_definition() -> JsonValue {
        let payload = BASE64.encode("source: registry.example.org/lizard:1.0\n");
        json!({
            "StackName": "lizard",
            "Resources": {
                "AppConfig": {
                    "Type": render::LAUNCH_CONFIG_TYPE,
                    "Properties": { "UserData": payload }
                }
            }
        })
    }

    fn definition_without_launch_config() -> JsonValue {
        json!({
            "StackName": "lizard",
            "Resources": {
                "AppLoadBalancer": { "Type": "AWS::ElasticLoadBalancing::LoadBalancer" }
            }
        })
    }

    struct FakeTool {
        calls: Mutex<Vec<&'static str>>,
        render_result: std::result::Result<JsonValue, ToolError>,
        records: Vec<StackRecord>,
        domains_result: std::result::Result<Vec<DomainRecord>, ToolError>,
        create_result: std::result::Result<(), ToolError>,
        patch_result: std::result::Result<(), ToolError>,
        respawn_result: std::result::Result<(), ToolError>,
        traffic_result: std::result::Result<(), ToolError>,
        remove_result: std::result::Result<(), ToolError>,
        list_result: std::result::Result<(), ToolError>,
    }

    impl Default for FakeTool {
        fn default() -> Self {
            Self {
                calls: Mutex::new(vec![]),
                render_result: Ok(rendered_definition()),
                records: vec![record("lizard", "42", 1460635167.0)],
                domains_result: Ok(vec![DomainRecord {
                    domain: "lizard.example.org".to_string(),
                    weight: None,
                }]),
                create_result: Ok(()),
                patch_result: Ok(()),
                respawn_result: Ok(()),
                traffic_result: Ok(()),
                remove_result: Ok(()),
                list_result: Ok(()),
            }
        }
    }

    impl FakeTool {
        fn note(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProvisionTool for FakeTool {
        fn render(
            &self,
            _template: &str,
            _version: &str,
            _application_version: Option<&str>,
            _parameters: &[String],
        ) -> std::result::Result<JsonValue, ToolError> {
            self.note("render");
            self.render_result.clone()
        }

        fn create(
            &self,
            _template: &str,
            _version: &str,
            _image_version: &str,
            _parameters: &[String],
            _disable_rollback: bool,
            _tags: &[(String, String)],
        ) -> std::result::Result<(), ToolError> {
            self.note("create");
            self.create_result.clone()
        }

        fn patch_image(
            &self,
            _name: &str,
            _version: &str,
            _image: &str,
        ) -> std::result::Result<(), ToolError> {
            self.note("patch_image");
            self.patch_result.clone()
        }

        fn respawn_instances(
            &self,
            _name: &str,
            _version: &str,
        ) -> std::result::Result<(), ToolError> {
            self.note("respawn_instances");
            self.respawn_result.clone()
        }

        fn domains(&self, _name: &str) -> std::result::Result<Vec<DomainRecord>, ToolError> {
            self.note("domains");
            self.domains_result.clone()
        }

        fn switch_traffic(
            &self,
            _name: &str,
            _version: &str,
            _percentage: u8,
        ) -> std::result::Result<(), ToolError> {
            self.note("switch_traffic");
            self.traffic_result.clone()
        }

        fn remove(&self, _name: &str, _version: &str) -> std::result::Result<(), ToolError> {
            self.note("remove");
            self.remove_result.clone()
        }

        fn list(&self, _name: Option<&str>) -> std::result::Result<Vec<StackRecord>, ToolError> {
            self.note("list");
            self.list_result.clone()?;
            Ok(self.records.clone())
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        calls: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl FakeRegistry {
        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ArtifactRegistry for FakeRegistry {
        fn create_version(
            &self,
            application_id: &str,
            version: &str,
            artifact: &str,
        ) -> std::result::Result<(), ToolError> {
            self.calls.lock().unwrap().push((
                application_id.to_string(),
                version.to_string(),
                artifact.to_string(),
            ));
            if self.fail {
                Err(ToolError::new("registry unavailable", ""))
            } else {
                Ok(())
            }
        }
    }

    fn create_request() -> CreateStack {
        CreateStack {
            keep_stacks: 2,
            new_traffic: 40,
            image_version: "1.0".to_string(),
            application_version: Some("1.0".to_string()),
            stack_version: "42".to_string(),
            template: "SomeTemplate: here".to_string(),
            parameters: vec![],
            disable_rollback: false,
        }
    }

    #[test]
    fn test_create_renders_registers_creates_and_refetches() {
        let tool = FakeTool::default();
        let registry = FakeRegistry::default();

        let stack = create_stack(&tool, &registry, create_request()).unwrap();

        assert_eq!(stack.stack_id(), "lizard-42");
        assert_eq!(stack.status, "CREATE_IN_PROGRESS");
        assert_eq!(tool.calls(), vec!["render", "create", "list"]);
        assert_eq!(
            registry.calls(),
            vec![(
                "lizard".to_string(),
                "1.0".to_string(),
                "registry.example.org/lizard:1.0".to_string()
            )]
        );
    }

    #[test]
    fn test_create_without_application_version_skips_registration() {
        let tool = FakeTool::default();
        let registry = FakeRegistry::default();

        let mut request = create_request();
        request.application_version = None;

        create_stack(&tool, &registry, request).unwrap();
        assert!(registry.calls().is_empty());
    }

    #[test]
    fn test_create_missing_component_aborts_before_any_side_effect() {
        let tool = FakeTool {
            render_result: Ok(definition_without_launch_config()),
            ..FakeTool::default()
        };
        let registry = FakeRegistry::default();

        let err = create_stack(&tool, &registry, create_request()).unwrap_err();

        assert!(matches!(err, StackError::MissingComponent(_)));
        assert_eq!(tool.calls(), vec!["render"]);
        assert!(registry.calls().is_empty());
    }

    #[test]
    fn test_create_render_failure_is_invalid_template() {
        let tool = FakeTool {
            render_result: Err(ToolError::new("template is not valid", "")),
            ..FakeTool::default()
        };
        let registry = FakeRegistry::default();

        let err = create_stack(&tool, &registry, create_request()).unwrap_err();

        match err {
            StackError::InvalidTemplate(message) => {
                assert_eq!(message, "template is not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tool.calls(), vec!["render"]);
    }

    #[test]
    fn test_create_proceeds_when_registration_fails() {
        let tool = FakeTool::default();
        let registry = FakeRegistry {
            fail: true,
            ..FakeRegistry::default()
        };

        let stack = create_stack(&tool, &registry, create_request()).unwrap();

        assert_eq!(stack.stack_id(), "lizard-42");
        assert_eq!(registry.calls().len(), 1);
        assert!(tool.calls().contains(&"create"));
    }

    #[test]
    fn test_create_tool_failure_is_deployment_failed() {
        let tool = FakeTool {
            create_result: Err(ToolError::new("rollback triggered", "")),
            ..FakeTool::default()
        };
        let registry = FakeRegistry::default();

        let err = create_stack(&tool, &registry, create_request()).unwrap_err();
        assert!(matches!(err, StackError::DeploymentFailed));
    }

    #[test]
    fn test_patch_traffic_without_domain_is_not_updated() {
        let tool = FakeTool {
            domains_result: Ok(vec![]),
            ..FakeTool::default()
        };

        let patch = PatchStack {
            new_ami_image: None,
            new_traffic: Some(40),
        };
        let err = patch_stack(&tool, "lizard-42", patch).unwrap_err();

        assert!(matches!(err, StackError::TrafficNotUpdated));
        assert!(!tool.calls().contains(&"switch_traffic"));
    }

    #[test]
    fn test_patch_image_failure_suppresses_traffic_step() {
        let tool = FakeTool {
            patch_result: Err(ToolError::new("no stack instances found", "")),
            ..FakeTool::default()
        };

        let patch = PatchStack {
            new_ami_image: Some("ami-12345".to_string()),
            new_traffic: Some(40),
        };
        let err = patch_stack(&tool, "lizard-42", patch).unwrap_err();

        match err {
            StackError::ImageUpdateFailed(message) => {
                assert_eq!(message, "no stack instances found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!tool.calls().contains(&"domains"));
        assert!(!tool.calls().contains(&"switch_traffic"));
    }

    #[test]
    fn test_patch_respawn_failure_is_image_update_failed() {
        let tool = FakeTool {
            respawn_result: Err(ToolError::new("respawn timed out", "")),
            ..FakeTool::default()
        };

        let patch = PatchStack {
            new_ami_image: Some("ami-12345".to_string()),
            new_traffic: None,
        };
        let err = patch_stack(&tool, "lizard-42", patch).unwrap_err();
        assert!(matches!(err, StackError::ImageUpdateFailed(_)));
    }

    #[test]
    fn test_patch_applies_both_operations_and_refetches() {
        let tool = FakeTool::default();

        let patch = PatchStack {
            new_ami_image: Some("ami-12345".to_string()),
            new_traffic: Some(40),
        };
        let stack = patch_stack(&tool, "lizard-42", patch).unwrap();

        assert_eq!(stack.stack_id(), "lizard-42");
        assert_eq!(
            tool.calls(),
            vec![
                "list",
                "patch_image",
                "respawn_instances",
                "domains",
                "switch_traffic",
                "list"
            ]
        );
    }

    #[test]
    fn test_patch_domain_lookup_failure_is_traffic_update_failed() {
        let tool = FakeTool {
            domains_result: Err(ToolError::new("domains lookup failed", "")),
            ..FakeTool::default()
        };

        let patch = PatchStack {
            new_ami_image: None,
            new_traffic: Some(40),
        };
        let err = patch_stack(&tool, "lizard-42", patch).unwrap_err();

        assert!(matches!(err, StackError::TrafficUpdateFailed(_)));
        assert!(!tool.calls().contains(&"switch_traffic"));
    }

    #[test]
    fn test_empty_patch_only_refetches() {
        let tool = FakeTool::default();

        let patch = PatchStack {
            new_ami_image: Some("   ".to_string()),
            new_traffic: None,
        };
        let stack = patch_stack(&tool, "lizard-42", patch).unwrap();

        assert_eq!(stack.stack_id(), "lizard-42");
        assert_eq!(tool.calls(), vec!["list", "list"]);
    }

    #[test]
    fn test_patch_unknown_stack_is_not_found() {
        let tool = FakeTool {
            records: vec![],
            ..FakeTool::default()
        };

        let err = patch_stack(&tool, "lizard-42", PatchStack::default()).unwrap_err();
        assert!(matches!(err, StackError::NotFound(_)));
    }

    #[test]
    fn test_delete_failure_carries_full_tool_output() {
        let tool = FakeTool {
            remove_result: Err(ToolError::new(
                "delete failed",
                "line one\nline two\nline three",
            )),
            ..FakeTool::default()
        };

        let err = delete_stack(&tool, "lizard-42").unwrap_err();
        match err {
            StackError::DeletionFailed { output } => {
                assert_eq!(output, "line one\nline two\nline three");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_delete_success() {
        let tool = FakeTool::default();
        delete_stack(&tool, "lizard-42").unwrap();
        assert_eq!(tool.calls(), vec!["remove"]);
    }

    #[test]
    fn test_unresolvable_identifier_is_not_found() {
        let tool = FakeTool::default();
        assert!(matches!(
            get_stack(&tool, "noseparator").unwrap_err(),
            StackError::NotFound(_)
        ));
        assert!(matches!(
            delete_stack(&tool, "noseparator").unwrap_err(),
            StackError::NotFound(_)
        ));
        assert!(tool.calls().is_empty());
    }

    #[test]
    fn test_get_stack_matches_name_with_separator() {
        let tool = FakeTool {
            records: vec![record("my-api-gateway", "7", 100.0)],
            ..FakeTool::default()
        };

        let stack = get_stack(&tool, "my-api-gateway-7").unwrap();
        assert_eq!(stack.stack_name, "my-api-gateway");
        assert_eq!(stack.version, "7");
    }

    #[test]
    fn test_all_stacks_sorted_by_creation_time() {
        let tool = FakeTool {
            records: vec![
                record("lizard", "3", 300.0),
                record("lizard", "1", 100.0),
                record("lizard", "2", 200.0),
            ],
            ..FakeTool::default()
        };

        let stacks = all_stacks(&tool).unwrap();
        let versions: Vec<&str> = stacks.iter().map(|stack| stack.version.as_str()).collect();
        assert_eq!(versions, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_all_stacks_query_failure() {
        let tool = FakeTool {
            list_result: Err(ToolError::new("platform unreachable", "")),
            ..FakeTool::default()
        };

        let err = all_stacks(&tool).unwrap_err();
        assert!(matches!(err, StackError::QueryFailed(_)));
    }
}
