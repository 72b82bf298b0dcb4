//! Placement decision types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which backend(s) receive a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Relational table column.
    Relational,
    /// Document collection.
    Document,
    /// Both backends (mandatory join fields).
    Both,
}

impl Placement {
    /// Returns true if values for this placement go to the relational backend.
    pub fn is_relational(&self) -> bool {
        matches!(self, Placement::Relational | Placement::Both)
    }

    /// Returns true if values for this placement go to the document backend.
    pub fn is_document(&self) -> bool {
        matches!(self, Placement::Document | Placement::Both)
    }

    /// Returns the stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Relational => "relational",
            Placement::Document => "document",
            Placement::Both => "both",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule of the decision tree produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementReason {
    /// The field is one of the mandatory join fields.
    MandatoryJoinField,
    /// The dominant value shape is an array or an object.
    NestedValue,
    /// Fewer observations than the configured minimum.
    InsufficientObservations,
    /// Frequent and type-stable.
    HighFrequencyStableType,
    /// Below the frequency threshold.
    LowFrequency,
    /// Below the type stability threshold.
    TypeDrifting,
}

impl PlacementReason {
    /// Returns the human-readable reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementReason::MandatoryJoinField => "mandatory join field",
            PlacementReason::NestedValue => "nested/array value",
            PlacementReason::InsufficientObservations => "insufficient observations",
            PlacementReason::HighFrequencyStableType => "high frequency and stable type",
            PlacementReason::LowFrequency => "low frequency",
            PlacementReason::TypeDrifting => "type drifting",
        }
    }
}

impl fmt::Display for PlacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routing decision for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDecision {
    /// Target backend(s).
    pub placement: Placement,
    /// Rule that produced the placement.
    pub reason: PlacementReason,
}

impl PlacementDecision {
    /// Creates a new decision.
    pub fn new(placement: Placement, reason: PlacementReason) -> Self {
        Self { placement, reason }
    }
}

impl fmt::Display for PlacementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.placement, self.reason)
    }
}
