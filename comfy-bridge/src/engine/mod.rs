//! ComfyUI engine abstraction layer.
//!
//! The `ComfyEngine` trait is the gateway to the remote engine: one logical
//! operation per method, every failure normalized into [`crate::error::Error`].
//! `ComfyClient` implements it over HTTP; tests substitute scripted engines.

mod client;
pub mod history;
pub mod schema;

pub use client::ComfyClient;

use async_trait::async_trait;
use comfy_bridge_common::{JobHandle, JobState, SubmitReceipt, Workflow};
use serde_json::Value;

use crate::error::Result;

/// Operations the bridge needs from a ComfyUI engine.
#[async_trait]
pub trait ComfyEngine: Send + Sync {
    /// Node catalog, either complete or scoped to one node class.
    async fn object_info(&self, node_type: Option<&str>) -> Result<Value>;

    /// Queue a workflow. `client_id` is only used by the engine for attribution.
    async fn submit(&self, workflow: &Workflow, client_id: &str) -> Result<SubmitReceipt>;

    /// Current state of a job, looking at history first and the live queue second.
    async fn job_status(&self, handle: &JobHandle) -> Result<JobState>;

    /// Engine-reported resource statistics, unparsed.
    async fn system_stats(&self) -> Result<Value>;

    /// Ask the engine to free transient memory, optionally unloading models too.
    async fn free(&self, unload_models: bool) -> Result<Value>;

    /// Interrupt whatever the engine is executing right now.
    async fn interrupt(&self) -> Result<Value>;
}
