//! Readers over the `object_info` node catalog.

use comfy_bridge_common::{ModelCatalog, NodeInfo, NodeMatch, NodeSearch};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum number of matches returned by a search.
pub const SEARCH_LIMIT: usize = 50;

/// A loader node whose combo input enumerates installed model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLoader {
    /// Node class to query, e.g. `CheckpointLoaderSimple`.
    pub class_type: &'static str,
    /// Required input holding the filename choices.
    pub input: &'static str,
    /// Key the list is reported under.
    pub key: &'static str,
    /// Human label used in the degraded-result note.
    pub label: &'static str,
}

impl ModelLoader {
    pub const CHECKPOINTS: ModelLoader = ModelLoader {
        class_type: "CheckpointLoaderSimple",
        input: "ckpt_name",
        key: "checkpoints",
        label: "checkpoint",
    };

    pub const LORAS: ModelLoader = ModelLoader {
        class_type: "LoraLoader",
        input: "lora_name",
        key: "loras",
        label: "LoRA",
    };

    pub const VAES: ModelLoader = ModelLoader {
        class_type: "VAELoader",
        input: "vae_name",
        key: "vaes",
        label: "VAE",
    };

    /// Read the filename choices out of this loader's schema.
    ///
    /// Accepts both the legacy `[["a", "b"], {...}]` input spec and the
    /// newer `["COMBO", {"options": ["a", "b"]}]` one.
    pub fn read(&self, schema: &Value) -> ModelCatalog {
        let spec = schema
            .get(self.class_type)
            .and_then(|node| node.get("input"))
            .and_then(|input| input.get("required"))
            .and_then(|required| required.get(self.input));

        let choices = spec.and_then(|spec| match spec.get(0) {
            Some(Value::Array(choices)) => Some(choices),
            Some(Value::String(kind)) if kind == "COMBO" => spec
                .get(1)
                .and_then(|opts| opts.get("options"))
                .and_then(Value::as_array),
            _ => None,
        });

        match choices {
            Some(choices) => ModelCatalog::Listed(
                choices
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            None => ModelCatalog::Unparsed {
                note: format!("Could not parse {} list", self.label),
            },
        }
    }
}

/// Schema summary of `node_type`, or `NodeNotFound` when the catalog lacks it.
pub fn node_info(schema: &Value, node_type: &str) -> Result<NodeInfo> {
    let node = schema
        .get(node_type)
        .ok_or_else(|| Error::NodeNotFound(node_type.to_string()))?;

    Ok(NodeInfo {
        name: node_type.to_string(),
        category: string_field(node, "category").unwrap_or("unknown").to_string(),
        description: string_field(node, "description").unwrap_or_default().to_string(),
        inputs: node.get("input").cloned().unwrap_or_else(|| Value::Object(Default::default())),
        outputs: node.get("output").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
        output_names: node
            .get("output_name")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    })
}

/// Case-insensitive substring search over node names and categories.
pub fn search_nodes(schema: &Value, query: &str) -> NodeSearch {
    let needle = query.to_lowercase();
    let matches: Vec<NodeMatch> = schema
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(name, node)| {
            name.to_lowercase().contains(&needle)
                || string_field(node, "category")
                    .unwrap_or_default()
                    .to_lowercase()
                    .contains(&needle)
        })
        .map(|(name, node)| NodeMatch {
            name: name.clone(),
            category: string_field(node, "category").unwrap_or("unknown").to_string(),
        })
        .collect();

    let total = matches.len();
    NodeSearch {
        matches: matches.into_iter().take(SEARCH_LIMIT).collect(),
        total,
    }
}

fn string_field<'a>(node: &'a Value, field: &str) -> Option<&'a str> {
    node.get(field).and_then(Value::as_str)
}
