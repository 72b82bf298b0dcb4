//! Field-name normalization.
//!
//! Raw names go through two stages: a syntactic pass (camelCase splitting,
//! lowercasing, separator cleanup) and a semantic pass that maps known
//! spelling families onto one canonical name. Once a raw name has been mapped
//! the mapping is recorded in a [`RuleBook`] and never recomputed, so adding
//! semantic rules later only affects names that have not been seen yet.

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;

/// Built-in semantic rules, evaluated top-down; the first match wins.
///
/// Patterns are matched against the syntactically normalized name. The
/// timestamp family deliberately excludes `t_stamp`, which is the client
/// timestamp join field and must keep its name.
pub const BUILTIN_SEMANTIC_RULES: [(&str, &str); 22] = [
    (r"^ip(_?addr(ess)?)?$", "ip_address"),
    (r"^ipv4(_?addr(ess)?)?$", "ip_address"),
    (r"^user(_?name)?$", "username"),
    (r"^user_id$", "user_id"),
    (r"^e?_?mail(_?addr(ess)?)?$", "email"),
    (r"^(phone|tel|telephone)(_?num(ber)?)?$", "phone"),
    (r"^(time)?_?stamp$", "timestamp"),
    (r"^created(_?at)?$", "created_at"),
    (r"^updated(_?at)?$", "updated_at"),
    (r"^(gps_?)?(lat|latitude)$", "gps_lat"),
    (r"^(gps_?)?(lon|long|longitude)$", "gps_lon"),
    (r"^dev(ice)?_?id$", "device_id"),
    (r"^dev(ice)?_?model$", "device_model"),
    (r"^sess(ion)?_?id$", "session_id"),
    (r"^net(work)?$", "network"),
    (r"^bat(tery)?(_?level)?$", "battery"),
    (r"^os(_?name)?$", "os"),
    (r"^operating_?system$", "os"),
    (r"^app_?version$", "app_version"),
    (r"^ver(sion)?$", "version"),
    (r"^(ua|user_?agent)$", "user_agent"),
    (r"^(geo|geo_?location|location)$", "location"),
];

/// Storage for raw → canonical mappings.
///
/// Implementations must make `record` first-writer-wins: if a mapping for
/// `raw` already exists it is returned unchanged.
pub trait RuleBook {
    /// Returns the recorded canonical name for `raw`, if any.
    fn lookup(&self, raw: &str) -> Option<String>;

    /// Records `raw → canonical` unless a mapping exists, and returns the
    /// mapping now in effect.
    fn record(&self, raw: &str, canonical: &str) -> String;
}

/// One semantic rule.
#[derive(Debug, Clone)]
struct SemanticRule {
    pattern: Regex,
    canonical: String,
}

/// Maps raw field names onto canonical names.
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    rules: Vec<SemanticRule>,
    camel_word: Regex,
    camel_boundary: Regex,
    separator_run: Regex,
}

impl FieldNormalizer {
    /// Creates a normalizer with the built-in semantic rules.
    pub fn new() -> Result<Self, ConfigError> {
        let mut normalizer = Self::without_semantic_rules()?;
        for (pattern, canonical) in BUILTIN_SEMANTIC_RULES {
            normalizer.push_rule(pattern, canonical)?;
        }
        Ok(normalizer)
    }

    /// Creates a normalizer that only applies the syntactic pass.
    pub fn without_semantic_rules() -> Result<Self, ConfigError> {
        Ok(Self {
            rules: Vec::new(),
            camel_word: compile(r"(.)([A-Z][a-z]+)")?,
            camel_boundary: compile(r"([a-z0-9])([A-Z])")?,
            separator_run: compile(r"[\s\-.]*_[\s\-._]*|[\s\-.]+")?,
        })
    }

    /// Appends a semantic rule after the existing ones.
    pub fn push_rule(&mut self, pattern: &str, canonical: &str) -> Result<(), ConfigError> {
        self.rules.push(SemanticRule {
            pattern: compile(pattern)?,
            canonical: canonical.to_string(),
        });
        Ok(())
    }

    /// Builder form of [`push_rule`](Self::push_rule).
    pub fn with_rule(mut self, pattern: &str, canonical: &str) -> Result<Self, ConfigError> {
        self.push_rule(pattern, canonical)?;
        Ok(self)
    }

    /// Number of semantic rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Normalizes `raw`, consulting and updating the rule book.
    ///
    /// A name that already has a recorded mapping is returned as recorded,
    /// even if the rule set has changed since.
    pub fn normalize(&self, raw: &str, rules: &impl RuleBook) -> String {
        if let Some(existing) = rules.lookup(raw) {
            return existing;
        }
        let canonical = self.canonicalize(raw);
        let recorded = rules.record(raw, &canonical);
        if recorded != raw {
            debug!(raw = %raw, canonical = %recorded, "Recorded normalization rule");
        }
        recorded
    }

    /// Computes the canonical name without consulting any recorded mapping.
    pub fn canonicalize(&self, raw: &str) -> String {
        let syntactic = self.syntactic(raw);
        self.semantic(&syntactic).unwrap_or(syntactic)
    }

    /// The syntactic pass: snake_case, lowercase, single separators.
    pub fn syntactic(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let split = self.camel_word.replace_all(raw, "${1}_${2}");
        let split = self.camel_boundary.replace_all(&split, "${1}_${2}");
        let lowered = split.to_lowercase();
        let collapsed = self.separator_run.replace_all(&lowered, "_");
        collapsed.trim_matches('_').to_string()
    }

    /// The semantic pass: the canonical name of the first matching rule.
    pub fn semantic(&self, syntactic: &str) -> Option<String> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(syntactic))
            .map(|rule| rule.canonical.clone())
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Invalid {
        errors: vec![format!("invalid pattern '{}': {}", pattern, e)],
    })
}
