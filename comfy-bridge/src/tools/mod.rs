//! Agent-facing tools.
//!
//! Each submodule contributes tool definitions and their handlers. Handlers
//! return plain JSON on success; the MCP layer turns `Err` into a tool result
//! flagged `isError`.

pub mod models;
pub mod system;
pub mod workflow;

use comfy_bridge_common::Tool;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::state::AppState;

/// All tools, in the order they are advertised.
pub fn definitions() -> Vec<Tool> {
    let mut tools = models::definitions();
    tools.extend(workflow::definitions());
    tools.extend(system::definitions());
    tools
}

/// Run the tool called `name`.
pub async fn call(
    state: &AppState,
    name: &str,
    arguments: Value,
    cancel: &CancellationToken,
) -> Result<Value> {
    match name {
        "list_checkpoints" | "list_loras" | "list_vaes" | "get_node_info" | "search_nodes" => {
            models::call(state, name, arguments).await
        }
        "execute_workflow" | "get_workflow_status" | "wait_for_completion" => {
            workflow::call(state, name, arguments, cancel).await
        }
        "get_system_stats" | "free_memory" | "interrupt" => {
            system::call(state, name, arguments).await
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

/// Deserialize tool arguments; a missing or null argument object counts as `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidArguments(e.to_string()))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Internal(e.to_string()))
}

/// Input schema for a tool that takes no arguments.
pub(crate) fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

pub(crate) fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::test_util::ScriptedEngine;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = definitions();
        let names: HashSet<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 11);
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in definitions() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn test_every_advertised_tool_dispatches() {
        let state = AppState::new(
            Config::default(),
            Arc::new(ScriptedEngine::unreachable()),
        );
        for tool in definitions() {
            let err = call(&state, &tool.name, Value::Null, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(
                !matches!(err, Error::UnknownTool(_)),
                "{} is advertised but not dispatched",
                tool.name
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let state = AppState::new(Config::default(), Arc::new(ScriptedEngine::with_statuses(Vec::new())));
        let err = call(&state, "render_video", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(ref n) if n == "render_video"));
    }

    #[test]
    fn test_null_arguments_are_empty_object() {
        #[derive(serde::Deserialize)]
        struct Args {
            #[serde(default)]
            flag: bool,
        }
        let args: Args = parse_args(Value::Null).unwrap();
        assert!(!args.flag);
    }
}
