//! Lead records
//!
//! Source producers disagree on field names (`email` vs `work_email`,
//! `first_name` vs `firstName`, ...). [`SourceRecord`] keeps the raw object and
//! answers alias lookups; [`DestinationRecord`] is the fixed write shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::unit::scalar_to_string;

/// A lead as returned by the source API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRecord(pub Map<String, Value>);

impl SourceRecord {
    /// First non-empty value among `aliases`, in order
    ///
    /// Strings and numbers qualify; anything else is treated as missing.
    pub fn first_non_empty(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .find_map(|alias| self.0.get(*alias).and_then(scalar_to_string))
    }
}

impl From<Value> for SourceRecord {
    /// Non-object items become empty records, which are later rejected for lacking an email
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// A lead in the shape the destination write API expects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub title: String,
    pub linkedin_url: String,
    pub custom_variables: CustomVariables,
}

/// Provenance carried alongside every written lead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomVariables {
    pub source: String,
    pub list_id: String,
    pub lead_id: String,
}
