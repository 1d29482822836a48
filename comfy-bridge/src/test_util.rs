//! In-memory engine for exercising the bridge without a ComfyUI server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use comfy_bridge_common::{JobHandle, JobState, JobStatus, SubmitReceipt, Workflow};
use serde_json::{json, Value};

use crate::engine::ComfyEngine;
use crate::error::{Error, Result};

/// Engine that replays a scripted sequence of job statuses.
///
/// The last status repeats once the script runs out. An unreachable engine
/// fails every call with a transport error.
pub struct ScriptedEngine {
    statuses: Mutex<VecDeque<JobStatus>>,
    schema: Value,
    reachable: bool,
    status_calls: AtomicUsize,
    submitted: Mutex<Vec<(Workflow, String)>>,
}

impl ScriptedEngine {
    pub fn with_statuses(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            schema: json!({}),
            reachable: true,
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::with_statuses(Vec::new())
        }
    }

    /// Catalog returned by `object_info`, filtered per node type when asked.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<(Workflow, String)> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    fn next_status(&self) -> JobStatus {
        let mut statuses = match self.statuses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(JobStatus::Unknown)
        } else {
            statuses.front().copied().unwrap_or(JobStatus::Unknown)
        }
    }
}

#[async_trait]
impl ComfyEngine for ScriptedEngine {
    async fn object_info(&self, node_type: Option<&str>) -> Result<Value> {
        self.check_reachable()?;
        Ok(match node_type {
            Some(node_type) => {
                let mut scoped = serde_json::Map::new();
                if let Some(node) = self.schema.get(node_type) {
                    scoped.insert(node_type.to_string(), node.clone());
                }
                Value::Object(scoped)
            }
            None => self.schema.clone(),
        })
    }

    async fn submit(&self, workflow: &Workflow, client_id: &str) -> Result<SubmitReceipt> {
        self.check_reachable()?;
        let mut submitted = match self.submitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        submitted.push((workflow.clone(), client_id.to_string()));
        Ok(SubmitReceipt::new(
            JobHandle::new(format!("job-{}", submitted.len())),
            Some(submitted.len() as u64 - 1),
        ))
    }

    async fn job_status(&self, handle: &JobHandle) -> Result<JobState> {
        self.check_reachable()?;
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(JobState::new(handle.clone(), self.next_status()))
    }

    async fn system_stats(&self) -> Result<Value> {
        self.check_reachable()?;
        Ok(json!({"system": {"os": "posix"}, "devices": []}))
    }

    async fn free(&self, _unload_models: bool) -> Result<Value> {
        self.check_reachable()?;
        Ok(json!({}))
    }

    async fn interrupt(&self) -> Result<Value> {
        self.check_reachable()?;
        Ok(json!({}))
    }
}
