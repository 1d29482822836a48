//! Job status classification from `/history` and `/queue` responses.
//!
//! `/history/<id>` answers `{}` for jobs it has not recorded, so a missing key
//! sends the lookup on to `/queue`, whose `queue_running` / `queue_pending`
//! lists hold items shaped `[number, prompt_id, prompt, extra, outputs]`.

use comfy_bridge_common::{JobHandle, JobState, JobStatus, OutputArtifact, OutputKind};
use serde_json::Value;

/// Classify a history response. `None` means the job is not in history.
pub fn classify_history(handle: &JobHandle, history: &Value) -> Option<JobState> {
    let entry = history.get(handle.as_str())?;

    let status = entry.get("status");
    let status_str = status
        .and_then(|s| s.get("status_str"))
        .and_then(Value::as_str);

    if status_str == Some("error") {
        let messages = status
            .and_then(|s| s.get("messages"))
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        return Some(JobState::failed(handle.clone(), messages));
    }

    if let Some(outputs) = entry.get("outputs") {
        return Some(JobState::completed(handle.clone(), collect_outputs(outputs)));
    }

    // Recorded but without outputs yet
    Some(JobState::new(handle.clone(), JobStatus::Running))
}

/// Classify a job that history does not know about using the live queue.
pub fn classify_queue(handle: &JobHandle, queue: &Value) -> JobState {
    let status = if queue_contains(queue, "queue_running", handle) {
        JobStatus::Running
    } else if queue_contains(queue, "queue_pending", handle) {
        JobStatus::Queued
    } else {
        JobStatus::Unknown
    };
    JobState::new(handle.clone(), status)
}

fn queue_contains(queue: &Value, list: &str, handle: &JobHandle) -> bool {
    queue
        .get(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .any(|item| item.get(1).and_then(Value::as_str) == Some(handle.as_str()))
        })
        .unwrap_or(false)
}

/// One artifact per item under each known output key of each node.
pub fn collect_outputs(outputs: &Value) -> Vec<OutputArtifact> {
    let Some(nodes) = outputs.as_object() else {
        return Vec::new();
    };

    let mut artifacts = Vec::new();
    for (node_id, node_output) in nodes {
        for kind in OutputKind::ALL {
            let Some(items) = node_output.get(kind.key()).and_then(Value::as_array) else {
                continue;
            };
            for item in items.iter().filter(|item| item.is_object()) {
                artifacts.push(OutputArtifact {
                    kind,
                    filename: item
                        .get("filename")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    subfolder: item
                        .get("subfolder")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    node_id: node_id.clone(),
                });
            }
        }
    }
    artifacts
}
