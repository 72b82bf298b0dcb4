//! Per-field cumulative statistics.

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PlacementDecision, SemanticType};

/// Maximum length, in characters, of a stored sample value.
pub const SAMPLE_VALUE_MAX_CHARS: usize = 100;

/// Everything known about one canonical field.
///
/// `appearances` always equals the sum of `type_counts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// Number of records in which the field was present.
    pub appearances: u64,

    /// Observation count per semantic type.
    pub type_counts: BTreeMap<SemanticType, u64>,

    /// Semantic types in the order they were first observed.
    #[serde(default)]
    pub type_order: Vec<SemanticType>,

    /// Ingestion time of the first record carrying the field.
    pub first_seen: Option<DateTime<Utc>>,

    /// Ingestion time of the most recent record carrying the field.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,

    /// Most recent raw values, oldest first.
    #[serde(default)]
    pub sample_values: VecDeque<String>,

    /// Whether the field looks like a unique identifier.
    #[serde(default)]
    pub is_unique: bool,

    /// The latest placement decision.
    #[serde(default)]
    pub current_placement: Option<PlacementDecision>,
}

impl FieldStatistics {
    /// Records one observation.
    pub(crate) fn record(
        &mut self,
        semantic: SemanticType,
        raw_value: &Value,
        seen_at: DateTime<Utc>,
        sample_capacity: usize,
    ) {
        self.appearances += 1;
        let count = self.type_counts.entry(semantic).or_insert(0);
        if *count == 0 && !self.type_order.contains(&semantic) {
            self.type_order.push(semantic);
        }
        *count += 1;

        if self.first_seen.is_none() {
            self.first_seen = Some(seen_at);
        }
        self.last_seen = Some(seen_at);

        self.sample_values.push_back(sample_text(raw_value));
        while self.sample_values.len() > sample_capacity {
            self.sample_values.pop_front();
        }
    }

    /// The most frequently observed type. Ties go to the type seen first.
    ///
    /// A field with no observations reports `null`.
    pub fn dominant_type(&self) -> SemanticType {
        let mut best: Option<(SemanticType, u64)> = None;
        for ty in self.ordered_types() {
            let count = self.type_counts.get(&ty).copied().unwrap_or(0);
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((ty, count)),
            }
        }
        best.map_or(SemanticType::Null, |(ty, _)| ty)
    }

    /// Share of observations with the dominant type, as a percentage.
    pub fn type_stability(&self) -> f64 {
        if self.appearances == 0 {
            return 0.0;
        }
        let dominant = self
            .type_counts
            .get(&self.dominant_type())
            .copied()
            .unwrap_or(0);
        (dominant as f64 * 100.0 / self.appearances as f64).clamp(0.0, 100.0)
    }

    /// Share of all accepted records that carried this field, as a percentage.
    pub fn frequency(&self, total_records_seen: u64) -> f64 {
        if total_records_seen == 0 {
            return 0.0;
        }
        (self.appearances as f64 * 100.0 / total_records_seen as f64).clamp(0.0, 100.0)
    }

    /// Ratio of distinct sampled values to sampled values, if at least two
    /// values have been sampled.
    pub fn distinct_ratio(&self) -> Option<f64> {
        if self.sample_values.len() < 2 {
            return None;
        }
        let distinct: HashSet<&str> = self.sample_values.iter().map(String::as_str).collect();
        Some(distinct.len() as f64 / self.sample_values.len() as f64)
    }

    /// Types in first-seen order, followed by any counted type missing from
    /// `type_order` (older metadata files may not carry the order).
    fn ordered_types(&self) -> impl Iterator<Item = SemanticType> + '_ {
        self.type_order.iter().copied().chain(
            self.type_counts
                .keys()
                .copied()
                .filter(|ty| !self.type_order.contains(ty)),
        )
    }
}

/// Renders a raw value for the sample reservoir.
fn sample_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > SAMPLE_VALUE_MAX_CHARS {
        text.chars().take(SAMPLE_VALUE_MAX_CHARS).collect()
    } else {
        text
    }
}

/// A consistent copy of one field's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    /// Canonical field name.
    pub name: String,
    /// The field's statistics at the time of the snapshot.
    pub stats: FieldStatistics,
    /// Total accepted records at the time of the snapshot.
    pub total_records_seen: u64,
}

impl FieldSnapshot {
    /// Frequency of the field across all accepted records.
    pub fn frequency(&self) -> f64 {
        self.stats.frequency(self.total_records_seen)
    }

    /// Type stability of the field.
    pub fn type_stability(&self) -> f64 {
        self.stats.type_stability()
    }

    /// Dominant semantic type of the field.
    pub fn dominant_type(&self) -> SemanticType {
        self.stats.dominant_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observe_n(stats: &mut FieldStatistics, ty: SemanticType, value: Value, n: usize) {
        for _ in 0..n {
            stats.record(ty, &value, Utc::now(), 50);
        }
    }

    #[test]
    fn test_stability_example() {
        let mut stats = FieldStatistics::default();
        observe_n(&mut stats, SemanticType::Integer, json!(1), 50);
        observe_n(&mut stats, SemanticType::String, json!("x"), 40);
        observe_n(&mut stats, SemanticType::Null, Value::Null, 10);

        assert_eq!(stats.appearances, 100);
        assert_eq!(stats.type_counts.values().sum::<u64>(), stats.appearances);
        assert_eq!(stats.dominant_type(), SemanticType::Integer);
        assert_eq!(stats.type_stability(), 50.0);
    }

    #[test]
    fn test_dominant_tie_goes_to_first_seen() {
        let mut stats = FieldStatistics::default();
        observe_n(&mut stats, SemanticType::String, json!("x"), 3);
        observe_n(&mut stats, SemanticType::Boolean, json!(true), 3);
        assert_eq!(stats.dominant_type(), SemanticType::String);

        let mut reversed = FieldStatistics::default();
        observe_n(&mut reversed, SemanticType::Boolean, json!(true), 3);
        observe_n(&mut reversed, SemanticType::String, json!("x"), 3);
        assert_eq!(reversed.dominant_type(), SemanticType::Boolean);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = FieldStatistics::default();
        assert_eq!(stats.dominant_type(), SemanticType::Null);
        assert_eq!(stats.type_stability(), 0.0);
        assert_eq!(stats.frequency(0), 0.0);
        assert_eq!(stats.distinct_ratio(), None);
    }

    #[test]
    fn test_frequency() {
        let mut stats = FieldStatistics::default();
        observe_n(&mut stats, SemanticType::Email, json!("a@b.co"), 95);
        assert_eq!(stats.frequency(100), 95.0);
        assert_eq!(stats.frequency(50), 100.0);
    }

    #[test]
    fn test_reservoir_evicts_oldest() {
        let mut stats = FieldStatistics::default();
        for i in 0..5 {
            stats.record(SemanticType::Integer, &json!(i), Utc::now(), 3);
        }
        assert_eq!(stats.sample_values, VecDeque::from(vec![
            "2".to_string(),
            "3".to_string(),
            "4".to_string()
        ]));
    }

    #[test]
    fn test_first_and_last_seen() {
        let mut stats = FieldStatistics::default();
        let first = Utc::now();
        let later = first + chrono::Duration::seconds(5);
        stats.record(SemanticType::Integer, &json!(1), first, 10);
        stats.record(SemanticType::Integer, &json!(2), later, 10);
        assert_eq!(stats.first_seen, Some(first));
        assert_eq!(stats.last_seen, Some(later));
    }

    #[test]
    fn test_sample_truncation() {
        let long = "x".repeat(250);
        assert_eq!(sample_text(&json!(long)).len(), SAMPLE_VALUE_MAX_CHARS);
        assert_eq!(sample_text(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(sample_text(&json!("plain")), "plain");
    }

    #[test]
    fn test_distinct_ratio() {
        let mut stats = FieldStatistics::default();
        observe_n(&mut stats, SemanticType::String, json!("same"), 4);
        assert_eq!(stats.distinct_ratio(), Some(0.25));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut stats = FieldStatistics::default();
        observe_n(&mut stats, SemanticType::IpAddress, json!("1.2.3.4"), 2);
        observe_n(&mut stats, SemanticType::String, json!("n/a"), 1);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"ip_address\":2"));
        let back: FieldStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
