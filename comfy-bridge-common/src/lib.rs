//! comfy-bridge common types
//!
//! Shared types used by the bridge server and its clients: workflow graphs,
//! job status, node catalog results, and MCP protocol messages.

pub mod job;
pub mod node;
pub mod protocol;
pub mod workflow;

pub use job::{JobHandle, JobState, JobStatus, OutputArtifact, OutputKind, SubmitReceipt};
pub use node::{ModelCatalog, NodeInfo, NodeMatch, NodeSearch};
pub use protocol::{
    CallToolParams, CallToolResult, CancelledParams, Content, InitializeResult, JsonRpcMessage,
    JsonRpcResponse, ReadResourceParams, RequestId, Resource, ResourceContents, RpcError,
    ServerInfo, Tool, PROTOCOL_VERSION,
};
pub use workflow::{NodeInput, NodeLink, Workflow, WorkflowNode};
