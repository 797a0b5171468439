//! Trip patch merger
//!
//! Deterministic merge of an AI-proposed [`TripPatch`] into an existing
//! [`TripDocument`]. Pure: computes a new document, never mutates the
//! original.
//!
//! Rules:
//! - `trip_meta` is shallow-merged field by field;
//! - each patch day replaces the existing day with the same `day` number
//!   wholesale, or is appended; the list is then sorted ascending by `day`;
//! - `totals` and `risks` are replaced wholesale when present;
//! - an empty patch is a no-op.

use crate::types::{TripDocument, TripPatch};

pub fn merge(original: &TripDocument, patch: &TripPatch) -> TripDocument {
    let mut merged = original.clone();

    if let Some(meta) = &patch.trip_meta {
        merged.trip_meta.apply(meta);
    }

    if let Some(days) = &patch.days {
        for day in days {
            match merged.days.iter_mut().find(|d| d.day == day.day) {
                Some(existing) => *existing = day.clone(),
                None => merged.days.push(day.clone()),
            }
        }
        merged.days.sort_by_key(|d| d.day);
    }

    if let Some(totals) = &patch.totals {
        merged.totals = totals.clone();
    }
    if let Some(risks) = &patch.risks {
        merged.risks = risks.clone();
    }

    merged
}
