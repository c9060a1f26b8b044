//! The tagged value tree that flows through the evaluator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed configuration value: a map, an ordered sequence, or a scalar.
///
/// Integers and floats are kept distinct even when numerically equal, so that
/// `42` (int) and `42.0` (float) never compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    Mapping(IndexMap<String, Node>),
}

impl Node {
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(s) => Some(s.as_slice()),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Node::Sequence(_))
    }

    /// The registered-directive keys (keys starting with `$`) present in this
    /// node, if it is a mapping. Empty for non-mappings.
    pub fn directive_keys(&self) -> Vec<&str> {
        match self {
            Node::Mapping(m) => m
                .keys()
                .map(String::as_str)
                .filter(|k| k.starts_with('$'))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Canonical JSON-ish byte form used for path evaluation and cache/cycle keys.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Node serialization is infallible")
    }

    pub fn from_canonical_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).expect("Node deserialization from its own JSON is infallible")
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        let json = serde_yaml::from_value::<serde_json::Value>(value)
            .unwrap_or(serde_json::Value::Null);
        Node::from_canonical_json(json)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Integer(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_and_float_are_distinct() {
        assert_ne!(Node::Integer(42), Node::Float(42.0));
    }

    #[test]
    fn directive_keys_ignores_plain_maps() {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Node::Integer(1));
        assert!(Node::Mapping(m).directive_keys().is_empty());
    }

    #[test]
    fn directive_keys_finds_dollar_prefixed() {
        let mut m = IndexMap::new();
        m.insert("$ref".to_string(), Node::String("local::a".into()));
        m.insert("port".to_string(), Node::Integer(1));
        assert_eq!(Node::Mapping(m).directive_keys(), vec!["$ref"]);
    }

    #[test]
    fn roundtrip_through_canonical_json() {
        let mut m = IndexMap::new();
        m.insert("a".to_string(), Node::Sequence(vec![Node::Integer(1), Node::Null]));
        let node = Node::Mapping(m);
        let json = node.to_canonical_json();
        assert_eq!(Node::from_canonical_json(json), node);
    }
}
