//! The placement decision tree.

use serde::Serialize;

use crate::config::PlacementThresholds;
use crate::error::ConfigError;
use crate::metadata::FieldSnapshot;
use crate::types::{Placement, PlacementDecision, PlacementReason, is_mandatory};

/// Fields grouped by their current placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementSummary {
    /// Fields routed to the relational backend only.
    pub relational: Vec<String>,
    /// Fields routed to the document backend only.
    pub document: Vec<String>,
    /// Fields routed to both backends.
    pub both: Vec<String>,
    /// Thresholds the decisions were made with.
    pub thresholds: PlacementThresholds,
}

/// Decides field placement from statistics snapshots.
///
/// The engine holds no state besides its thresholds, so the same snapshot
/// always produces the same decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementEngine {
    thresholds: PlacementThresholds,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self {
            thresholds: PlacementThresholds::default(),
        }
    }
}

impl PlacementEngine {
    /// Creates an engine with the given thresholds.
    pub fn new(thresholds: PlacementThresholds) -> Result<Self, ConfigError> {
        thresholds
            .validate()
            .map_err(|errors| ConfigError::Invalid { errors })?;
        Ok(Self { thresholds })
    }

    /// Returns the thresholds.
    pub fn thresholds(&self) -> &PlacementThresholds {
        &self.thresholds
    }

    /// Evaluates the decision tree for one field.
    pub fn decide(&self, field: &FieldSnapshot) -> PlacementDecision {
        if is_mandatory(&field.name) {
            return PlacementDecision::new(Placement::Both, PlacementReason::MandatoryJoinField);
        }

        if field.dominant_type().is_nested() {
            return PlacementDecision::new(Placement::Document, PlacementReason::NestedValue);
        }

        if field.stats.appearances < self.thresholds.min_observations {
            return PlacementDecision::new(
                Placement::Document,
                PlacementReason::InsufficientObservations,
            );
        }

        let frequency = field.frequency();
        let stability = field.type_stability();

        if frequency >= self.thresholds.frequency_threshold
            && stability >= self.thresholds.stability_threshold
        {
            return PlacementDecision::new(
                Placement::Relational,
                PlacementReason::HighFrequencyStableType,
            );
        }

        if frequency < self.thresholds.frequency_threshold {
            PlacementDecision::new(Placement::Document, PlacementReason::LowFrequency)
        } else {
            PlacementDecision::new(Placement::Document, PlacementReason::TypeDrifting)
        }
    }

    /// Groups fields by the decision the engine makes for them now.
    pub fn summary<'a>(&self, fields: impl IntoIterator<Item = &'a FieldSnapshot>) -> PlacementSummary {
        let mut summary = PlacementSummary {
            thresholds: self.thresholds,
            ..Default::default()
        };
        for field in fields {
            let bucket = match self.decide(field).placement {
                Placement::Relational => &mut summary.relational,
                Placement::Document => &mut summary.document,
                Placement::Both => &mut summary.both,
            };
            bucket.push(field.name.clone());
        }
        summary
    }
}
