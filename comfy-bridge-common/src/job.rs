//! Job lifecycle types: handles, status, and output artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque job identifier issued by the engine (`prompt_id`).
///
/// Whatever the engine returns is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the engine's pending queue.
    Queued,
    /// Executing, or finished executing without recorded outputs yet.
    Running,
    /// Finished with outputs.
    Completed,
    /// The engine reported an execution error.
    Error,
    /// A local wait gave up before the job reached a terminal state.
    Timeout,
    /// Not found in history or queue. May not be indexed yet, or may be invalid.
    Unknown,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Timeout
        )
    }

    /// States that end a wait loop when observed from the engine.
    ///
    /// `Timeout` is produced locally, so the engine never reports it.
    pub fn is_settled(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Timeout => "timeout",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Media kind of an output artifact, named after the key the engine files it under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Images,
    Video,
    Videos,
    Gifs,
    Audio,
}

impl OutputKind {
    /// Output keys in the order they are scanned within a node's outputs.
    pub const ALL: [OutputKind; 5] = [
        OutputKind::Images,
        OutputKind::Video,
        OutputKind::Videos,
        OutputKind::Gifs,
        OutputKind::Audio,
    ];

    pub fn key(self) -> &'static str {
        match self {
            OutputKind::Images => "images",
            OutputKind::Video => "video",
            OutputKind::Videos => "videos",
            OutputKind::Gifs => "gifs",
            OutputKind::Audio => "audio",
        }
    }
}

/// One file produced by a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    #[serde(rename = "type")]
    pub kind: OutputKind,
    pub filename: Option<String>,
    #[serde(default)]
    pub subfolder: String,
    pub node_id: String,
}

/// Snapshot of a job as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub prompt_id: JobHandle,
    pub status: JobStatus,
    /// Populated only for completed jobs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputArtifact>,
    /// Engine status messages for errored jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl JobState {
    pub fn new(prompt_id: JobHandle, status: JobStatus) -> Self {
        Self {
            prompt_id,
            status,
            outputs: Vec::new(),
            error: None,
        }
    }

    pub fn completed(prompt_id: JobHandle, outputs: Vec<OutputArtifact>) -> Self {
        Self {
            outputs,
            ..Self::new(prompt_id, JobStatus::Completed)
        }
    }

    pub fn failed(prompt_id: JobHandle, messages: Value) -> Self {
        Self {
            error: Some(messages),
            ..Self::new(prompt_id, JobStatus::Error)
        }
    }

    pub fn timed_out(prompt_id: JobHandle) -> Self {
        Self::new(prompt_id, JobStatus::Timeout)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub prompt_id: JobHandle,
    /// Queue number assigned by the engine, if reported.
    pub queue_position: Option<u64>,
    pub status: JobStatus,
}

impl SubmitReceipt {
    pub fn new(prompt_id: JobHandle, queue_position: Option<u64>) -> Self {
        Self {
            prompt_id,
            queue_position,
            status: JobStatus::Queued,
        }
    }
}
