//! Name matching between lead lists and campaigns

use leadsync_common::types::{DestinationEntity, SourceUnit};
use std::collections::HashMap;
use tracing::warn;

/// Case-insensitive name index over destination campaigns
///
/// Names are compared after lowercasing only; whitespace is significant.
/// When two campaigns share a name, the one fetched last wins.
#[derive(Debug, Default)]
pub struct EntityMatcher {
    by_name: HashMap<String, DestinationEntity>,
}

impl EntityMatcher {
    pub fn new(entities: impl IntoIterator<Item = DestinationEntity>) -> Self {
        let mut by_name = HashMap::new();
        for entity in entities {
            let key = entity.name.to_lowercase();
            if let Some(previous) = by_name.insert(key, entity) {
                warn!(
                    name = %previous.name,
                    replaced_id = %previous.id,
                    "Duplicate campaign name, keeping the later campaign"
                );
            }
        }
        Self { by_name }
    }

    /// Campaign whose name equals the unit's name, ignoring case
    pub fn match_unit(&self, unit: &SourceUnit) -> Option<&DestinationEntity> {
        self.find(unit.name.as_deref()?)
    }

    pub fn find(&self, name: &str) -> Option<&DestinationEntity> {
        self.by_name.get(&name.to_lowercase())
    }

    /// Number of distinct campaign names
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
