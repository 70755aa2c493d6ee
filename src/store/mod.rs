//! Workflow record store — durable, queryable audit of workflow runs.
//!
//! One record per `workflow_id`, created at workflow start and updated
//! once after the pipeline completes or fails. Records are never
//! deleted by this core; retention is an external concern.

pub mod libsql_backend;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::WorkflowPayload;

pub use libsql_backend::LibSqlStore;
pub use memory::MemoryStore;

/// Lifecycle state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Processing,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status string; unknown values are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Durable envelope around a payload snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: Uuid,
    pub tenant_id: String,
    pub payload: WorkflowPayload,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRecord {
    /// Initial record for a freshly constructed payload.
    pub fn processing(payload: WorkflowPayload) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: payload.workflow_id,
            tenant_id: payload.tenant_id.clone(),
            payload,
            status: WorkflowStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing filter; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub tenant_id: Option<String>,
    pub status: Option<WorkflowStatus>,
}

/// Backend-agnostic workflow record store.
///
/// Creation of distinct ids may happen concurrently; the two writes for
/// one id (initial `processing`, final `completed`/`failed`) come from
/// a single writer and are applied in order.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Conflict`] if the
    /// workflow id already exists.
    async fn create(&self, record: &WorkflowRecord) -> Result<(), StoreError>;

    /// Replace the payload snapshot and status for an existing record,
    /// refreshing `updated_at`. Fails with [`StoreError::NotFound`] if
    /// the id does not exist.
    async fn update(
        &self,
        workflow_id: Uuid,
        payload: &WorkflowPayload,
        status: WorkflowStatus,
    ) -> Result<(), StoreError>;

    /// Fetch a record by id.
    async fn get(&self, workflow_id: Uuid) -> Result<Option<WorkflowRecord>, StoreError>;

    /// List records matching the filter, most recent first, bounded by
    /// `limit`.
    async fn list(
        &self,
        filter: &ListFilter,
        limit: usize,
    ) -> Result<Vec<WorkflowRecord>, StoreError>;
}
