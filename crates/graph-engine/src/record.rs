//! Value types stored by the graph engine.
//!
//! Records are plain data: nothing here validates ids, timestamps or weights.
//! An empty id or a NaN weight is stored exactly as received.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form string properties attached to nodes and edges.
pub type Attributes = HashMap<String, String>;

fn default_weight() -> f64 {
    1.0
}

/// A node keyed by `id`. Upserting the same id replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Epoch milliseconds.
    #[serde(rename = "ts", default)]
    pub timestamp: i64,
    #[serde(rename = "attrs", default)]
    pub attributes: Attributes,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            timestamp,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A timestamped edge between two node ids.
///
/// `src` and `dst` are not checked against the node table; an edge may name
/// ids that were never upserted as nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Epoch milliseconds.
    #[serde(rename = "ts", default)]
    pub timestamp: i64,
    #[serde(rename = "attrs", default)]
    pub attributes: Attributes,
}

impl EdgeRecord {
    pub fn new(
        src: impl Into<String>,
        dst: impl Into<String>,
        kind: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            kind: kind.into(),
            weight: default_weight(),
            timestamp,
            attributes: Attributes::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The endpoint opposite `from`. For a self-loop this is `from` itself.
    pub fn far_end(&self, from: &str) -> &str {
        if self.src == from {
            &self.dst
        } else {
            &self.src
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_defaults_to_unit_weight() {
        let edge = EdgeRecord::new("a", "b", "MENTION", 10);
        assert_eq!(edge.weight, 1.0);
        assert!(edge.attributes.is_empty());
    }

    #[test]
    fn test_far_end() {
        let edge = EdgeRecord::new("a", "b", "MENTION", 10);
        assert_eq!(edge.far_end("a"), "b");
        assert_eq!(edge.far_end("b"), "a");

        let self_loop = EdgeRecord::new("a", "a", "SELF", 10);
        assert_eq!(self_loop.far_end("a"), "a");
    }

    #[test]
    fn test_json_field_names_and_defaults() {
        let edge: EdgeRecord =
            serde_json::from_str(r#"{"src":"a","dst":"b","type":"LINK","ts":5}"#).unwrap();
        assert_eq!(edge.kind, "LINK");
        assert_eq!(edge.timestamp, 5);
        assert_eq!(edge.weight, 1.0);

        let node = NodeRecord::new("doc:1", "doc", 3).with_attribute("title", "Doc 1");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "doc");
        assert_eq!(value["ts"], 3);
        assert_eq!(value["attrs"]["title"], "Doc 1");
    }

    #[test]
    fn test_no_validation_on_construction() {
        let node = NodeRecord::new("", "", -42);
        assert_eq!(node.id, "");
        assert_eq!(node.timestamp, -42);

        let edge = EdgeRecord::new("", "", "", -1).with_weight(f64::NAN);
        assert!(edge.weight.is_nan());
    }
}
