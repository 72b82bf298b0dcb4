//! Core types shared across the engine.
//!
//! - [`SemanticType`], [`ColumnType`] - value classification and its column mapping
//! - [`Placement`], [`PlacementDecision`] - routing decisions
//! - [`SplitRecord`], [`JoinedRecord`] - record projections
//!
//! # Example
//!
//! ```
//! use strata_persistence::types::{ColumnType, SemanticType};
//!
//! assert_eq!(SemanticType::IpAddress.column_type(), ColumnType::Varchar(15));
//! assert!(SemanticType::Dict.is_nested());
//! ```

mod placement;
mod record;
mod semantic;

pub use placement::{Placement, PlacementDecision, PlacementReason};
pub use record::{
    CLIENT_TIMESTAMP_FIELD, IDENTITY_FIELD, JoinedRecord, MANDATORY_FIELDS, Projection,
    SERVER_TIMESTAMP_FIELD, SplitRecord, is_mandatory,
};
pub use semantic::{ColumnType, SemanticType};
