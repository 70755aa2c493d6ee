//! Error types for the ops desk.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Workflow record store errors.
///
/// `Conflict` and `NotFound` are fatal for the offending operation but
/// must never corrupt other records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Workflow {workflow_id} already exists")]
    Conflict { workflow_id: String },

    #[error("Workflow {workflow_id} not found")]
    NotFound { workflow_id: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// External collaborator errors (thread fetch/send, calendar,
/// classification, knowledge base).
///
/// Stages catch these at their own boundary and convert them into a
/// failed log entry; they never abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("{connector} request failed: {reason}")]
    RequestFailed { connector: String, reason: String },

    #[error("{connector} timed out after {timeout:?}")]
    Timeout { connector: String, timeout: Duration },

    #[error("{connector} returned an invalid response: {reason}")]
    InvalidResponse { connector: String, reason: String },

    #[error("{connector} is unavailable: {reason}")]
    Unavailable { connector: String, reason: String },
}

/// Workflow-level failures that escape the pipeline boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed input before any stage runs. The record (if created)
    /// is marked failed and no agent logs are produced.
    #[error("Invalid workflow input: {reason}")]
    Construction { reason: String },
}

/// Result type alias for the desk.
pub type Result<T> = std::result::Result<T, Error>;
