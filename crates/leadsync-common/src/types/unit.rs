//! Source lists and destination campaigns

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder name reported for lists that arrive without one
pub const UNKNOWN_LIST_NAME: &str = "Unknown";

/// A named list of leads on the source side
///
/// `id` and `name` are optional here because upstream payloads are not
/// trusted; the orchestrator rejects incomplete units before doing any work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl SourceUnit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Build a unit from one item of the source list collection
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: value.get("id").and_then(scalar_to_string),
            name: value.get("name").and_then(non_empty_str),
        }
    }

    /// Name used in run report entries
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_LIST_NAME)
    }

    /// Both identifying fields, if present
    pub fn identity(&self) -> Option<(&str, &str)> {
        Some((self.id.as_deref()?, self.name.as_deref()?))
    }
}

/// A campaign on the destination side that receives leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEntity {
    pub id: String,
    pub name: String,
}

impl DestinationEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Build an entity from one item of the campaign collection
    ///
    /// Returns `None` when the campaign lacks an id or a name, since it could
    /// neither be matched nor written to.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            id: value.get("id").and_then(scalar_to_string)?,
            name: value.get("name").and_then(non_empty_str)?,
        })
    }
}

/// Render a JSON string or number as an identifier; empty strings count as absent
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}
