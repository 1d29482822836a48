//! Workflow (job graph) types in ComfyUI's API format.
//!
//! A workflow maps node ids to node definitions. Each node names its class and
//! wires its inputs either to literal values or to another node's output slot.
//! The graph is submitted as-is; consistency checks (cycles, dangling links,
//! unknown classes) happen on the engine side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete job graph keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow {
    nodes: BTreeMap<String, WorkflowNode>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any previous node with the same id.
    pub fn with_node(mut self, id: impl Into<String>, node: WorkflowNode) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &WorkflowNode)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A single processing node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Node class name (e.g. "KSampler", "SaveImage"). Empty when the caller
    /// left it out; the engine reports that on submission.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_type: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, NodeInput>,
    /// Fields the bridge does not interpret (e.g. `_meta`), passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowNode {
    pub fn new(class_type: impl Into<String>) -> Self {
        Self {
            class_type: class_type.into(),
            inputs: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, input: impl Into<NodeInput>) -> Self {
        self.inputs.insert(name.into(), input.into());
        self
    }
}

/// A node input: either a link to another node's output or a literal value.
///
/// Links are encoded on the wire as `["<node_id>", <output_index>]`. Anything
/// that does not have exactly that shape is treated as a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeInput {
    Link(NodeLink),
    Literal(Value),
}

/// Reference to output slot `output` of node `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink(pub String, pub u32);

impl NodeLink {
    pub fn new(node_id: impl Into<String>, output: u32) -> Self {
        Self(node_id.into(), output)
    }

    pub fn node_id(&self) -> &str {
        &self.0
    }

    pub fn output(&self) -> u32 {
        self.1
    }
}

impl From<NodeLink> for NodeInput {
    fn from(link: NodeLink) -> Self {
        NodeInput::Link(link)
    }
}

impl From<Value> for NodeInput {
    fn from(value: Value) -> Self {
        NodeInput::Literal(value)
    }
}

impl From<&str> for NodeInput {
    fn from(value: &str) -> Self {
        NodeInput::Literal(Value::String(value.to_string()))
    }
}
