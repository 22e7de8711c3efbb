//! Stack lifecycle request DTOs

use serde::{Deserialize, Serialize};

/// Request to create a new stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStack {
    /// How many older stacks out-of-band reconciliation should retain.
    pub keep_stacks: u32,
    /// Traffic percentage the new stack should eventually receive.
    pub new_traffic: u8,
    pub image_version: String,
    #[serde(default)]
    pub application_version: Option<String>,
    pub stack_version: String,
    /// Deployment template, YAML text, rendered by the provisioning tool.
    pub template: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub disable_rollback: bool,
}

/// Request to patch an existing stack
///
/// Both fields are independent operations; an unset field never triggers
/// its operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchStack {
    #[serde(default)]
    pub new_ami_image: Option<String>,
    #[serde(default)]
    pub new_traffic: Option<u8>,
}

impl PatchStack {
    /// Drops empty fields so that a blank value reads as absent.
    pub fn filtered(self) -> Self {
        Self {
            new_ami_image: self
                .new_ami_image
                .filter(|image| !image.trim().is_empty()),
            new_traffic: self.new_traffic,
        }
    }

    /// True when no operation remains after filtering.
    pub fn is_empty(&self) -> bool {
        self.new_ami_image.is_none() && self.new_traffic.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_drops_blank_image() {
        let patch = PatchStack {
            new_ami_image: Some("  ".to_string()),
            new_traffic: None,
        };

        let filtered = patch.filtered();
        assert!(filtered.new_ami_image.is_none());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filtered_keeps_real_values() {
        let patch = PatchStack {
            new_ami_image: Some("ami-12345".to_string()),
            new_traffic: Some(40),
        };

        let filtered = patch.filtered();
        assert_eq!(filtered.new_ami_image.as_deref(), Some("ami-12345"));
        assert_eq!(filtered.new_traffic, Some(40));
        assert!(!filtered.is_empty());
    }

    #[test]
    fn test_missing_fields_deserialize_as_absent() {
        let patch: PatchStack = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }
}
