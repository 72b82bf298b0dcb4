//! Semantic type detection for raw JSON values.
//!
//! Detection is a cascade evaluated strictly top-down. The order matters:
//! booleans are tested before numbers, and among strings a UUID is tested
//! before the looser address and timestamp shapes.

use serde_json::Value;

use crate::types::SemanticType;

/// A string predicate paired with the type it identifies.
type StringRule = (fn(&str) -> bool, SemanticType);

/// String classification rules, first match wins.
const STRING_RULES: [StringRule; 5] = [
    (is_uuid, SemanticType::Uuid),
    (is_ipv4, SemanticType::IpAddress),
    (is_email, SemanticType::Email),
    (is_url, SemanticType::Url),
    (has_timestamp_prefix, SemanticType::Timestamp),
];

/// Classifies raw values into [`SemanticType`]s.
///
/// `detect` is total: anything unrecognized is a generic string.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use strata_persistence::classify::TypeDetector;
/// use strata_persistence::types::SemanticType;
///
/// let detector = TypeDetector::new();
/// assert_eq!(detector.detect(&json!("1.2.3.4")), SemanticType::IpAddress);
/// assert_eq!(detector.detect(&json!(1.2)), SemanticType::Float);
/// assert_eq!(detector.detect(&json!("1.2")), SemanticType::String);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeDetector;

impl TypeDetector {
    /// Creates a detector.
    pub fn new() -> Self {
        Self
    }

    /// Detects the semantic type of a value.
    pub fn detect(&self, value: &Value) -> SemanticType {
        match value {
            Value::Null => SemanticType::Null,
            Value::Bool(_) => SemanticType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => SemanticType::Integer,
            Value::Number(_) => SemanticType::Float,
            Value::Array(_) => SemanticType::List,
            Value::Object(_) => SemanticType::Dict,
            Value::String(s) => self.detect_str(s),
        }
    }

    /// Detects the semantic type of a string value.
    pub fn detect_str(&self, s: &str) -> SemanticType {
        if s.is_empty() {
            return SemanticType::String;
        }
        STRING_RULES
            .iter()
            .find(|(matches, _)| matches(s))
            .map(|(_, ty)| *ty)
            .unwrap_or(SemanticType::String)
    }

    /// Detects an optional value; a missing value is `null`.
    pub fn detect_opt(&self, value: Option<&Value>) -> SemanticType {
        value.map_or(SemanticType::Null, |v| self.detect(v))
    }
}

/// `8-4-4-4-12` hex groups.
fn is_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => *b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

/// Exactly four dot-separated groups of 1-3 digits, each in 0..=255.
fn is_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            (1..=3).contains(&part.len())
                && part.bytes().all(|b| b.is_ascii_digit())
                && part.parse::<u16>().is_ok_and(|octet| octet <= 255)
        })
}

/// `local@domain.tld` with a single `@` and an alphabetic TLD of two or more
/// characters.
fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let domain_ok = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = domain.rsplit_once('.').is_some_and(|(host, tld)| {
        !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
    });
    local_ok && domain_ok && tld_ok
}

/// `http://` or `https://` followed by at least one non-whitespace character
/// and no whitespace anywhere.
fn is_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty()) && !s.chars().any(char::is_whitespace)
}

/// Starts with `YYYY-MM-DDThh:mm:ss`.
fn has_timestamp_prefix(s: &str) -> bool {
    const SHAPE: &[u8; 19] = b"dddd-dd-ddTdd:dd:dd";
    let bytes = s.as_bytes();
    bytes.len() >= SHAPE.len()
        && SHAPE.iter().zip(bytes).all(|(shape, b)| match shape {
            b'd' => b.is_ascii_digit(),
            literal => literal == b,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(value: Value) -> SemanticType {
        TypeDetector::new().detect(&value)
    }

    #[test]
    fn test_ip_versus_float() {
        assert_eq!(detect(json!("1.2.3.4")), SemanticType::IpAddress);
        assert_eq!(detect(json!("192.168.1.1")), SemanticType::IpAddress);
        assert_eq!(detect(json!(1.2)), SemanticType::Float);
        assert_eq!(detect(json!("1.2")), SemanticType::String);
    }

    #[test]
    fn test_ip_octet_bounds() {
        assert_eq!(detect(json!("999.1.1.1")), SemanticType::String);
        assert_eq!(detect(json!("255.255.255.255")), SemanticType::IpAddress);
        assert_eq!(detect(json!("1.2.3")), SemanticType::String);
        assert_eq!(detect(json!("1.2.3.4.5")), SemanticType::String);
        assert_eq!(detect(json!("1..3.4")), SemanticType::String);
        assert_eq!(detect(json!("0001.2.3.4")), SemanticType::String);
    }

    #[test]
    fn test_boolean_before_integer() {
        assert_eq!(detect(json!(true)), SemanticType::Boolean);
        assert_eq!(detect(json!(false)), SemanticType::Boolean);
        assert_eq!(detect(json!(1)), SemanticType::Integer);
    }

    #[test]
    fn test_null_and_missing() {
        assert_eq!(detect(Value::Null), SemanticType::Null);
        assert_eq!(TypeDetector::new().detect_opt(None), SemanticType::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(detect(json!(-42)), SemanticType::Integer);
        assert_eq!(detect(json!(u64::MAX)), SemanticType::Integer);
        assert_eq!(detect(json!(2.0)), SemanticType::Float);
    }

    #[test]
    fn test_nested() {
        assert_eq!(detect(json!([1, 2, 3])), SemanticType::List);
        assert_eq!(detect(json!({"key": "value"})), SemanticType::Dict);
    }

    #[test]
    fn test_uuid() {
        assert_eq!(
            detect(json!("550e8400-e29b-41d4-a716-446655440000")),
            SemanticType::Uuid
        );
        assert_eq!(
            detect(json!("550E8400-E29B-41D4-A716-446655440000")),
            SemanticType::Uuid
        );
        assert_eq!(
            detect(json!("550e8400e29b41d4a716446655440000")),
            SemanticType::String
        );
    }

    #[test]
    fn test_email() {
        assert_eq!(detect(json!("user@example.com")), SemanticType::Email);
        assert_eq!(detect(json!("first.last+tag@mail.co.uk")), SemanticType::Email);
        assert_eq!(detect(json!("@example.com")), SemanticType::String);
        assert_eq!(detect(json!("a@b@example.com")), SemanticType::String);
        assert_eq!(detect(json!("user@localhost")), SemanticType::String);
        assert_eq!(detect(json!("user@example.c0m")), SemanticType::String);
    }

    #[test]
    fn test_url() {
        assert_eq!(detect(json!("https://example.com")), SemanticType::Url);
        assert_eq!(detect(json!("http://example.com/a?b=c")), SemanticType::Url);
        assert_eq!(detect(json!("https://exa mple.com")), SemanticType::String);
        assert_eq!(detect(json!("https://")), SemanticType::String);
        assert_eq!(detect(json!("ftp://example.com")), SemanticType::String);
    }

    #[test]
    fn test_timestamp_prefix() {
        assert_eq!(detect(json!("2024-01-15T10:30:00")), SemanticType::Timestamp);
        assert_eq!(
            detect(json!("2024-01-15T10:30:00.123456Z")),
            SemanticType::Timestamp
        );
        assert_eq!(detect(json!("2024-01-15 10:30:00")), SemanticType::String);
        assert_eq!(detect(json!("2024-01-15")), SemanticType::String);
    }

    #[test]
    fn test_fallback_string() {
        assert_eq!(detect(json!("")), SemanticType::String);
        assert_eq!(detect(json!("hello world")), SemanticType::String);
    }
}
