//! Job tools: submit a workflow, check on it, wait for it.

use std::time::Duration;

use comfy_bridge_common::{JobHandle, Tool, Workflow};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::{parse_args, to_json, tool};
use crate::error::{Error, Result};
use crate::state::AppState;

pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "execute_workflow",
            "Execute a ComfyUI workflow and return the prompt_id for polling. Each workflow key is a node id; each value is {\"class_type\": \"...\", \"inputs\": {...}}, where an input is a literal or a [node_id, output_index] link.",
            json!({
                "type": "object",
                "properties": {
                    "workflow": {
                        "type": "object",
                        "description": "Workflow in ComfyUI API format, e.g. {\"1\": {\"class_type\": \"CheckpointLoaderSimple\", \"inputs\": {\"ckpt_name\": \"model.safetensors\"}}, \"2\": {\"class_type\": \"CLIPTextEncode\", \"inputs\": {\"text\": \"a cat\", \"clip\": [\"1\", 1]}}}"
                    },
                    "client_id": {
                        "type": "string",
                        "description": "Optional client identifier for tracking."
                    }
                },
                "required": ["workflow"]
            }),
        ),
        tool(
            "get_workflow_status",
            "Check the status of a queued or running workflow. Returns queued/running/completed/error/unknown and the output files once completed.",
            json!({
                "type": "object",
                "properties": {
                    "prompt_id": {
                        "type": "string",
                        "description": "The prompt_id returned from execute_workflow."
                    }
                },
                "required": ["prompt_id"]
            }),
        ),
        tool(
            "wait_for_completion",
            "Wait for a workflow to complete and return its final status and output files. Returns status \"timeout\" if the job is still pending when the wait ends.",
            json!({
                "type": "object",
                "properties": {
                    "prompt_id": {
                        "type": "string",
                        "description": "The prompt_id to wait for."
                    },
                    "timeout_seconds": {
                        "type": "integer",
                        "description": "Maximum time to wait in seconds (default 300). Zero or less checks nothing and reports timeout."
                    }
                },
                "required": ["prompt_id"]
            }),
        ),
    ]
}

/// Hosts sometimes pass the graph as a JSON-encoded string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkflowArg {
    Graph(Workflow),
    Encoded(String),
}

impl WorkflowArg {
    fn into_workflow(self) -> Result<Workflow> {
        match self {
            WorkflowArg::Graph(workflow) => Ok(workflow),
            WorkflowArg::Encoded(text) => serde_json::from_str(&text)
                .map_err(|e| Error::InvalidArguments(format!("workflow is not valid JSON: {}", e))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteArgs {
    workflow: WorkflowArg,
    #[serde(default)]
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusArgs {
    prompt_id: JobHandle,
}

#[derive(Debug, Deserialize)]
struct WaitArgs {
    prompt_id: JobHandle,
    #[serde(default)]
    timeout_seconds: Option<i64>,
}

impl WaitArgs {
    /// Non-positive timeouts report `timeout` without polling.
    fn timeout(&self, default: Duration) -> Duration {
        match self.timeout_seconds {
            Some(secs) => Duration::from_secs(u64::try_from(secs).unwrap_or(0)),
            None => default,
        }
    }
}

pub async fn call(
    state: &AppState,
    name: &str,
    arguments: Value,
    cancel: &CancellationToken,
) -> Result<Value> {
    match name {
        "execute_workflow" => {
            let args: ExecuteArgs = parse_args(arguments)?;
            let workflow = args.workflow.into_workflow()?;
            let client_id = args
                .client_id
                .unwrap_or_else(|| state.config.server.client_id.clone());
            let receipt = state.engine.submit(&workflow, &client_id).await?;
            to_json(&receipt)
        }
        "get_workflow_status" => {
            let args: StatusArgs = parse_args(arguments)?;
            let job = state.engine.job_status(&args.prompt_id).await?;
            to_json(&job)
        }
        "wait_for_completion" => {
            let args: WaitArgs = parse_args(arguments)?;
            let timeout = args.timeout(state.config.polling.default_timeout());
            tracing::info!("Waiting up to {:?} for job {}", timeout, args.prompt_id);
            let job = state.poller.wait(&args.prompt_id, timeout, cancel).await?;
            to_json(&job)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}
