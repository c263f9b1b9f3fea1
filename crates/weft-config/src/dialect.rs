//! Per-dialect configuration sections

use serde::{Deserialize, Serialize};

/// OrientDB SQL processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientDbConfig {
    /// Class used when a vertex operation names no label
    pub vertex_class: String,
    /// Class used when an edge operation names no label
    pub edge_class: String,
    /// Record id attribute (`@rid`)
    pub id_field: String,
    /// Class attribute used for label predicates (`@class`)
    pub label_field: String,
    /// Fields whose string values are emitted without quotes
    pub raw_fields: Vec<String>,
    /// Retries requested by `commit retry N` at the end of a batch
    pub commit_retries: u32,
}

impl Default for OrientDbConfig {
    fn default() -> Self {
        Self {
            vertex_class: "V".to_string(),
            edge_class: "E".to_string(),
            id_field: "@rid".to_string(),
            label_field: "@class".to_string(),
            raw_fields: vec!["@rid".to_string()],
            commit_retries: 100,
        }
    }
}

impl OrientDbConfig {
    /// Whether values compared against `field` must stay unquoted
    pub fn is_raw_field(&self, field: &str) -> bool {
        field == self.id_field || self.raw_fields.iter().any(|f| f == field)
    }
}

/// Cypher processor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CypherConfig {
    /// Variable bound to matched nodes
    pub node_variable: String,
    /// Variable bound to matched or created relationships
    pub edge_variable: String,
    /// Relationship type for edges created without a label
    pub default_edge_type: String,
}

impl Default for CypherConfig {
    fn default() -> Self {
        Self {
            node_variable: "n".to_string(),
            edge_variable: "e".to_string(),
            default_edge_type: "RELATED_TO".to_string(),
        }
    }
}
