//! Trip document and patch types
//!
//! A `TripDocument` is the full itinerary the planner maintains for a user.
//! A `TripPatch` is the partial document an AI response proposes; any subset
//! of the top-level fields may be present. Merge semantics live in
//! [`crate::merge`].

use serde::{Deserialize, Serialize};

/// Trip-level metadata. All fields optional: generated documents are loose
/// and a patch may touch any subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_estimate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<String>,
}

impl TripMeta {
    /// Shallow field-by-field overwrite: fields present in `patch` replace
    /// ours, absent fields are preserved.
    pub fn apply(&mut self, patch: &TripMeta) {
        if patch.title.is_some() {
            self.title = patch.title.clone();
        }
        if patch.date_range.is_some() {
            self.date_range = patch.date_range.clone();
        }
        if patch.days.is_some() {
            self.days = patch.days;
        }
        if patch.budget_estimate.is_some() {
            self.budget_estimate = patch.budget_estimate.clone();
        }
        if patch.transport_strategy.is_some() {
            self.transport_strategy = patch.transport_strategy.clone();
        }
        if patch.pace.is_some() {
            self.pace = patch.pace.clone();
        }
    }
}

/// One planned day. `day` is the unique ordering key within a document.
///
/// Stops are kept as raw JSON: their shape varies by backend and the core
/// never interprets them, only carries them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub stops: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_checklist: Vec<String>,
}

/// Full itinerary document. Owned by the caller; the merger computes a new
/// value and never mutates in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDocument {
    #[serde(default)]
    pub trip_meta: TripMeta,
    #[serde(default)]
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub totals: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risks: Vec<String>,
}

/// Partial trip update proposed by an AI response. Every field optional;
/// an all-`None` patch merges as a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_meta: Option<TripMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<String>>,
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        self.trip_meta.is_none()
            && self.days.is_none()
            && self.totals.is_none()
            && self.risks.is_none()
    }
}
