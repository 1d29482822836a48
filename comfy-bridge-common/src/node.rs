//! Node catalog types derived from the engine's `object_info` schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema summary of one node class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    /// Raw input spec (`required` / `optional` / `hidden` groups).
    pub inputs: Value,
    /// Output type names, e.g. `["MODEL", "CLIP", "VAE"]`.
    pub outputs: Value,
    pub output_names: Value,
}

/// A node class matching a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMatch {
    pub name: String,
    pub category: String,
}

/// Result of a catalog search: the first page of matches plus the full count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSearch {
    pub matches: Vec<NodeMatch>,
    pub total: usize,
}

/// Model filenames a loader node accepts.
///
/// `Unparsed` is the degraded outcome when the engine answered but the
/// expected nested field was missing; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCatalog {
    Listed(Vec<String>),
    Unparsed { note: String },
}

impl ModelCatalog {
    /// Filenames, empty when the schema could not be read.
    pub fn models(&self) -> &[String] {
        match self {
            ModelCatalog::Listed(models) => models,
            ModelCatalog::Unparsed { .. } => &[],
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            ModelCatalog::Listed(_) => None,
            ModelCatalog::Unparsed { note } => Some(note),
        }
    }

    /// Render as `{"<key>": [...]}`, adding `"note"` for the degraded case.
    pub fn to_json(&self, key: &str) -> Value {
        let mut body = serde_json::Map::new();
        body.insert(key.to_string(), Value::from(self.models().to_vec()));
        if let Some(note) = self.note() {
            body.insert("note".to_string(), Value::from(note));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listed_catalog_json() {
        let catalog = ModelCatalog::Listed(vec!["flux1-dev.safetensors".to_string()]);
        assert_eq!(
            catalog.to_json("checkpoints"),
            json!({"checkpoints": ["flux1-dev.safetensors"]})
        );
    }

    #[test]
    fn test_unparsed_catalog_json() {
        let catalog = ModelCatalog::Unparsed {
            note: "Could not parse VAE list".to_string(),
        };
        assert!(catalog.models().is_empty());
        assert_eq!(
            catalog.to_json("vaes"),
            json!({"vaes": [], "note": "Could not parse VAE list"})
        );
    }
}
