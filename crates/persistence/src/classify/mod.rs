//! Field identity and value classification.
//!
//! - [`FieldNormalizer`] maps spelling variants (`ip`, `IP`, `IpAddress`) onto
//!   one canonical field name.
//! - [`TypeDetector`] classifies raw values into [`SemanticType`]s.
//!
//! Both are ordered rule tables evaluated top-down so that the precedence of
//! overlapping rules is explicit and testable.
//!
//! [`SemanticType`]: crate::types::SemanticType

mod detector;
mod normalizer;

pub use detector::TypeDetector;
pub use normalizer::{BUILTIN_SEMANTIC_RULES, FieldNormalizer, RuleBook};
