//! Engine housekeeping tools.

use comfy_bridge_common::Tool;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{no_arguments, parse_args, tool};
use crate::error::{Error, Result};
use crate::state::AppState;

pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_system_stats",
            "Get ComfyUI system statistics including VRAM usage.",
            no_arguments(),
        ),
        tool(
            "free_memory",
            "Free GPU memory in ComfyUI.",
            json!({
                "type": "object",
                "properties": {
                    "unload_models": {
                        "type": "boolean",
                        "description": "If true, also unload all loaded models.",
                        "default": false
                    }
                }
            }),
        ),
        tool(
            "interrupt",
            "Interrupt the currently running workflow.",
            no_arguments(),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct FreeArgs {
    #[serde(default)]
    unload_models: bool,
}

pub async fn call(state: &AppState, name: &str, arguments: Value) -> Result<Value> {
    match name {
        "get_system_stats" => state.engine.system_stats().await,
        "free_memory" => {
            let args: FreeArgs = parse_args(arguments)?;
            tracing::info!("Requesting memory release (unload_models={})", args.unload_models);
            state.engine.free(args.unload_models).await
        }
        "interrupt" => {
            tracing::info!("Interrupting current engine job");
            state.engine.interrupt().await
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}
