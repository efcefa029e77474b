//! Explain error types
//!
//! A failed explain is fatal for that single query only; the analyzer
//! logs it and moves on to the next statement.

use thiserror::Error;

use crate::connection::ConnectionError;

/// Result type for explain operations
pub type ExplainResult<T> = Result<T, ExplainError>;

/// Failures while explaining and scoring one statement
#[derive(Debug, Error)]
pub enum ExplainError {
    /// A plan node type the dialect model does not cover. Reported
    /// with the offending payload so the model can be extended.
    #[error("unhandled plan node: {payload}")]
    UnknownNode { payload: String },

    /// The planner returned JSON without the expected structure
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// The EXPLAIN round trip itself failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ExplainError {
    /// Build an `UnknownNode` from the node's JSON payload
    pub fn unknown_node(node: &serde_json::Value) -> Self {
        ExplainError::UnknownNode {
            payload: node.to_string(),
        }
    }
}
