//! Discovery tools: installed models and the node catalog.

use comfy_bridge_common::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{no_arguments, parse_args, to_json, tool};
use crate::engine::schema::{self, ModelLoader};
use crate::error::{Error, Result};
use crate::state::AppState;

pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "list_checkpoints",
            "List all available checkpoint models in ComfyUI. Returns model filenames that can be used with CheckpointLoaderSimple or UNETLoader.",
            no_arguments(),
        ),
        tool(
            "list_loras",
            "List all available LoRA models in ComfyUI. Returns LoRA filenames for use with the LoraLoader node.",
            no_arguments(),
        ),
        tool(
            "list_vaes",
            "List all available VAE models in ComfyUI.",
            no_arguments(),
        ),
        tool(
            "get_node_info",
            "Get detailed information about a specific ComfyUI node type: inputs, outputs and their types.",
            json!({
                "type": "object",
                "properties": {
                    "node_type": {
                        "type": "string",
                        "description": "The node class name (e.g. \"KSampler\", \"CLIPTextEncode\", \"UNETLoader\")"
                    }
                },
                "required": ["node_type"]
            }),
        ),
        tool(
            "search_nodes",
            "Search for ComfyUI nodes by name or category. Returns up to 50 matches plus the total count.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search term (e.g. \"sampler\", \"image\", \"video\", \"flux\")"
                    }
                },
                "required": ["query"]
            }),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct NodeInfoArgs {
    node_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

pub async fn call(state: &AppState, name: &str, arguments: Value) -> Result<Value> {
    match name {
        "list_checkpoints" => list_models(state, ModelLoader::CHECKPOINTS).await,
        "list_loras" => list_models(state, ModelLoader::LORAS).await,
        "list_vaes" => list_models(state, ModelLoader::VAES).await,
        "get_node_info" => {
            let args: NodeInfoArgs = parse_args(arguments)?;
            let schema = state.engine.object_info(Some(&args.node_type)).await?;
            to_json(&schema::node_info(&schema, &args.node_type)?)
        }
        "search_nodes" => {
            let args: SearchArgs = parse_args(arguments)?;
            let schema = state.engine.object_info(None).await?;
            to_json(&schema::search_nodes(&schema, &args.query))
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

async fn list_models(state: &AppState, loader: ModelLoader) -> Result<Value> {
    let schema = state.engine.object_info(Some(loader.class_type)).await?;
    let catalog = loader.read(&schema);
    if let Some(note) = catalog.note() {
        tracing::warn!("{} schema from engine was not readable: {}", loader.class_type, note);
    }
    Ok(catalog.to_json(loader.key))
}
