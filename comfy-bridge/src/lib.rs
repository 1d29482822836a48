//! comfy-bridge - exposes a ComfyUI server to an agent host as MCP tools.
//!
//! The agent submits a workflow graph, gets a job handle back immediately and
//! then checks on it, either once per call or through a bounded wait.

pub mod config;
pub mod engine;
pub mod error;
pub mod mcp;
pub mod poller;
pub mod state;
pub mod template;
pub mod test_util;
pub mod tools;
