//! Per-field reporting.

use serde::Serialize;

use crate::metadata::FieldSnapshot;
use crate::placement::{PlacementEngine, should_index};
use crate::types::{Placement, PlacementReason, SemanticType};

/// What the engine currently knows and decides about one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    /// Canonical field name.
    pub name: String,
    /// Number of accepted records containing the field.
    pub appearances: u64,
    /// Percentage of accepted records containing the field.
    pub frequency: f64,
    /// Percentage of observations matching the dominant type.
    pub type_stability: f64,
    /// Most frequently observed semantic type.
    pub dominant_type: SemanticType,
    /// Current placement.
    pub placement: Placement,
    /// Rule that produced the placement.
    pub reason: PlacementReason,
    /// Whether the field looks like a unique identifier.
    pub is_unique: bool,
    /// Whether the field is worth a secondary index.
    pub should_index: bool,
}

impl FieldReport {
    /// Builds a report, deciding placement from the snapshot as it is now.
    pub fn from_snapshot(snapshot: &FieldSnapshot, engine: &PlacementEngine) -> Self {
        let decision = engine.decide(snapshot);
        Self {
            name: snapshot.name.clone(),
            appearances: snapshot.stats.appearances,
            frequency: snapshot.frequency(),
            type_stability: snapshot.type_stability(),
            dominant_type: snapshot.dominant_type(),
            placement: decision.placement,
            reason: decision.reason,
            is_unique: snapshot.stats.is_unique,
            should_index: should_index(snapshot),
        }
    }
}
