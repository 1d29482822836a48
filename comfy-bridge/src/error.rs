//! Error types for the bridge.

use serde_json::{json, Value};

/// Everything that can go wrong while serving a tool call.
///
/// Transport failures of every engine operation collapse into `Transport`,
/// `Malformed` or `Rejected`, so a caller has a single `Result` to check.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection refused, request timeout, or other I/O failure.
    #[error("Engine communication error: {0}")]
    Transport(String),

    /// The engine answered but the body could not be decoded.
    #[error("Malformed engine response: {0}")]
    Malformed(String),

    /// The engine answered with a non-success status.
    #[error("Engine rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Node type '{0}' not found")]
    NodeNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable kind, used in tool error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Malformed(_) => "malformed_response",
            Error::Rejected { .. } => "rejected",
            Error::NodeNotFound(_) => "not_found",
            Error::InvalidArguments(_) => "invalid_arguments",
            Error::UnknownTool(_) => "unknown_tool",
            Error::UnknownResource(_) => "unknown_resource",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal_error",
        }
    }

    /// True for the failures that mean the engine could not be talked to properly.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Malformed(_) | Error::Rejected { .. }
        )
    }

    /// Body returned to the host when a tool fails.
    pub fn to_json(&self) -> Value {
        json!({
            "error": self.to_string(),
            "kind": self.kind(),
        })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Malformed(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = Error::NodeNotFound("Nope".to_string()).to_json();
        assert_eq!(body["error"], "Node type 'Nope' not found");
        assert_eq!(body["kind"], "not_found");
    }

    #[test]
    fn test_transport_family() {
        assert!(Error::Transport("refused".into()).is_transport());
        assert!(Error::Malformed("eof".into()).is_transport());
        assert!(Error::Rejected { status: 400, body: String::new() }.is_transport());
        assert!(!Error::Cancelled.is_transport());
        assert!(!Error::NodeNotFound("x".into()).is_transport());
    }
}
