//! Domain identifier types
//!
//! Identifiers in rule definitions and clinical documents are written either as
//! JSON strings or JSON numbers depending on the producer, so `5` and `"5"` must
//! denote the same node. Both are normalised to a canonical string form here.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Structural identifier of a document node or rule set
///
/// # Examples
///
/// ```
/// use ehr2row::domain::ids::NodeId;
/// use serde_json::json;
///
/// let a = NodeId::from_json(&json!(5)).unwrap();
/// let b = NodeId::from_json(&json!("5")).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a NodeId from its canonical string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalises a JSON string or number into a NodeId
    ///
    /// Integral numbers are rendered without a fractional part (`5.0` becomes `"5"`).
    /// Any other JSON type is not an identifier and yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        canonical_key(value).map(Self)
    }

    /// Whether a JSON value denotes this identifier
    pub fn matches(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => s == &self.0,
            Value::Number(_) => canonical_key(value).is_some_and(|k| k == self.0),
            _ => false,
        }
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical string form of a scalar identifier value
pub(crate) fn canonical_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 9.0e15 {
                    Some((f as i64).to_string())
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("Node ID cannot be empty".to_string());
        }
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeId::from_json(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("identifier must be a string or number, got {value}"))
        })
    }
}

/// Template identifier
///
/// The `id` of a root document and of the root rule set that maps it. Rule stores
/// keyed by number use [`TemplateId::as_numeric`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(NodeId);

impl TemplateId {
    /// Creates a new TemplateId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Template ID cannot be empty".to_string());
        }
        Ok(Self(NodeId::new(id)))
    }

    /// Returns the template ID as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the template ID as a structural node id
    pub fn as_node_id(&self) -> &NodeId {
        &self.0
    }

    /// Numeric form of the template ID, if it has one
    pub fn as_numeric(&self) -> Option<i64> {
        self.0.as_str().trim().parse().ok()
    }
}

impl From<NodeId> for TemplateId {
    fn from(id: NodeId) -> Self {
        Self(id)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_id_string_and_number_are_equal() {
        let from_number = NodeId::from_json(&json!(5)).unwrap();
        let from_string = NodeId::from_json(&json!("5")).unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "5");
    }

    #[test]
    fn test_node_id_integral_float() {
        let id = NodeId::from_json(&json!(12.0)).unwrap();
        assert_eq!(id.as_str(), "12");

        let id = NodeId::from_json(&json!(1.5)).unwrap();
        assert_eq!(id.as_str(), "1.5");
    }

    #[test]
    fn test_node_id_rejects_non_scalars() {
        assert!(NodeId::from_json(&json!(null)).is_none());
        assert!(NodeId::from_json(&json!([1])).is_none());
        assert!(NodeId::from_json(&json!({"id": 1})).is_none());
        assert!(NodeId::from_json(&json!(true)).is_none());
    }

    #[test]
    fn test_node_id_matches() {
        let id = NodeId::new("7");
        assert!(id.matches(&json!(7)));
        assert!(id.matches(&json!("7")));
        assert!(!id.matches(&json!(8)));
        assert!(!id.matches(&json!(null)));
    }

    #[test]
    fn test_node_id_deserialization() {
        let ids: Vec<NodeId> = serde_json::from_value(json!([1, "A", 2.0])).unwrap();
        assert_eq!(ids[0].as_str(), "1");
        assert_eq!(ids[1].as_str(), "A");
        assert_eq!(ids[2].as_str(), "2");

        assert!(serde_json::from_value::<NodeId>(json!({})).is_err());
    }

    #[test]
    fn test_node_id_serializes_as_string() {
        let json = serde_json::to_value(NodeId::new("42")).unwrap();
        assert_eq!(json, json!("42"));
    }

    #[test]
    fn test_template_id_creation() {
        let id = TemplateId::new("1001").unwrap();
        assert_eq!(id.as_str(), "1001");
        assert_eq!(id.as_numeric(), Some(1001));
        assert!(TemplateId::new("  ").is_err());
    }

    #[test]
    fn test_template_id_non_numeric() {
        let id = TemplateId::from_str("VITALS").unwrap();
        assert_eq!(id.as_numeric(), None);
    }

    #[test]
    fn test_template_id_from_node_id() {
        let id: TemplateId = NodeId::from_json(&json!(33)).unwrap().into();
        assert_eq!(id.to_string(), "33");
        assert_eq!(id.as_node_id(), &NodeId::new("33"));
    }
}
