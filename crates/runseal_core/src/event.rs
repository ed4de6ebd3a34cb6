//! Event kinds and field scalars.
//!
//! The set of recordable actions is closed: every event carries one of the
//! kinds below plus a fixed per-kind field schema. Anything outside the set
//! is rejected at append time.

use crate::error::SealError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of observed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Monitored run started
    Begin,
    /// File opened by the target
    FileOpen,
    /// Subprocess spawned by the target
    SubprocessCall,
    /// Outbound network attempt, allowed or blocked
    NetworkAttempt,
    /// Randomness drawn by the target
    RandomDraw,
    /// Monitored run ended
    End,
}

impl EventKind {
    /// All recognized kinds, in wire-name order
    pub const ALL: [EventKind; 6] = [
        Self::Begin,
        Self::FileOpen,
        Self::SubprocessCall,
        Self::NetworkAttempt,
        Self::RandomDraw,
        Self::End,
    ];

    /// Wire name of this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::FileOpen => "file_open",
            Self::SubprocessCall => "subprocess_call",
            Self::NetworkAttempt => "network_attempt",
            Self::RandomDraw => "random_draw",
            Self::End => "end",
        }
    }

    /// Required fields and their scalar types
    #[must_use]
    pub const fn required_fields(self) -> &'static [(&'static str, FieldType)] {
        match self {
            Self::Begin => &[("target", FieldType::Str), ("args", FieldType::Str)],
            Self::FileOpen => &[("path", FieldType::Str), ("mode", FieldType::Str)],
            Self::SubprocessCall => &[("argv", FieldType::Str)],
            Self::NetworkAttempt => &[
                ("host", FieldType::Str),
                ("port", FieldType::Int),
                ("allowed", FieldType::Bool),
            ],
            Self::RandomDraw => &[
                ("algorithm", FieldType::Str),
                ("value_digest", FieldType::Str),
            ],
            Self::End => &[("exit_code", FieldType::Int)],
        }
    }

    /// Whether this kind closes a run
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SealError::UnknownEventKind {
                kind: s.to_string(),
            })
    }
}

/// Scalar type of an event field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string
    Str,
    /// Signed 64-bit integer
    Int,
    /// Boolean
    Bool,
}

impl FieldType {
    /// Whether a value has this type
    #[must_use]
    pub const fn matches(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (Self::Str, FieldValue::Str(_))
                | (Self::Int, FieldValue::Int(_))
                | (Self::Bool, FieldValue::Bool(_))
        )
    }

    /// Human-readable type name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Bool => "boolean",
        }
    }
}

/// Scalar value of an event field
///
/// Variant order matters for untagged deserialization: booleans and integers
/// must be tried before strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean
    Bool(bool),
    /// Signed 64-bit integer
    Int(i64),
    /// UTF-8 string
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Ordered field map of an event
pub type Fields = IndexMap<String, FieldValue>;

/// Build a field map from name/value pairs
#[must_use]
pub fn fields<const N: usize>(pairs: [(&str, FieldValue); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_roundtrip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = "file_mmap".parse::<EventKind>().unwrap_err();
        assert_eq!(
            err,
            SealError::UnknownEventKind {
                kind: "file_mmap".to_string()
            }
        );
    }

    #[test]
    fn test_kind_serde_uses_wire_names() {
        let json = serde_json::to_string(&EventKind::FileOpen).unwrap();
        assert_eq!(json, "\"file_open\"");
        let kind: EventKind = serde_json::from_str("\"network_attempt\"").unwrap();
        assert_eq!(kind, EventKind::NetworkAttempt);
    }

    #[test]
    fn test_field_value_untagged_serde() {
        let value: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, FieldValue::Bool(true));
        let value: FieldValue = serde_json::from_str("443").unwrap();
        assert_eq!(value, FieldValue::Int(443));
        let value: FieldValue = serde_json::from_str("\"/tmp/a\"").unwrap();
        assert_eq!(value, FieldValue::Str("/tmp/a".to_string()));
    }

    #[test]
    fn test_field_value_rejects_non_scalars() {
        assert!(serde_json::from_str::<FieldValue>("1.5").is_err());
        assert!(serde_json::from_str::<FieldValue>("[1,2]").is_err());
        assert!(serde_json::from_str::<FieldValue>("{\"a\":1}").is_err());
    }

    #[test]
    fn test_field_type_matches() {
        assert!(FieldType::Int.matches(&FieldValue::Int(80)));
        assert!(!FieldType::Int.matches(&FieldValue::Str("80".to_string())));
        assert!(FieldType::Bool.matches(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_required_fields_schema() {
        let schema = EventKind::NetworkAttempt.required_fields();
        assert_eq!(schema.len(), 3);
        assert!(schema.contains(&("allowed", FieldType::Bool)));
    }

    #[test]
    fn test_fields_helper_preserves_order() {
        let map = fields([
            ("path", FieldValue::from("/tmp/a")),
            ("mode", FieldValue::from("wb")),
        ]);
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["path", "mode"]);
    }
}
