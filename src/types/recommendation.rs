//! Recommendation item and query types

use serde::{Deserialize, Serialize};

/// A single AI-generated recommendation (attraction, restaurant, ...).
///
/// `name`, `description` and `category` are required by the wire format;
/// an item is only considered valid when all three are non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_hours: Option<String>,
}

impl RecommendationItem {
    /// Minimum-field validity rule: the extractor only emits items that
    /// pass this check.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.category.trim().is_empty()
    }
}

/// Query context for a recommendation search. Captured at session init and
/// passed through to batch fetches so refills stay on topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    pub location: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub category: String,
}
