//! Stack domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the name and version halves of a composite stack id.
pub const STACK_ID_SEPARATOR: char = '-';

/// A deployed stack as reported by the infrastructure platform.
///
/// The platform is the source of truth for every field here; services never
/// mutate a `Stack` locally, they re-fetch it after each mutating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub stack_name: String,
    pub version: String,
    /// Platform-reported lifecycle state (e.g. CREATE_IN_PROGRESS), verbatim.
    pub status: String,
    #[serde(with = "creation_time_format")]
    pub creation_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_version: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub disable_rollback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_traffic: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_stacks: Option<u32>,
}

impl Stack {
    /// The external-facing composite identifier for this stack.
    pub fn stack_id(&self) -> String {
        format!(
            "{}{}{}",
            self.stack_name, STACK_ID_SEPARATOR, self.version
        )
    }
}

/// The `(name, version)` identity of a stack.
///
/// Rendered externally as `name-version`. Names may themselves contain the
/// separator, so parsing splits on the last occurrence only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackId {
    pub name: String,
    pub version: String,
}

impl StackId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parses a composite identifier, splitting from the right.
    ///
    /// Returns `None` when the identifier cannot resolve to a `(name,
    /// version)` pair: no separator, or an empty half.
    pub fn parse(id: &str) -> Option<Self> {
        let (name, version) = id.rsplit_once(STACK_ID_SEPARATOR)?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(name, version))
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, STACK_ID_SEPARATOR, self.version)
    }
}

/// Fixed date-time profile for `creation_time` on the wire.
///
/// Stacks always transmit UTC instants as e.g. `2016-04-14T11:59:27+0000`.
pub mod creation_time_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|time| time.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
