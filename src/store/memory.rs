//! In-memory workflow store for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::WorkflowPayload;

use super::{ListFilter, WorkflowRecord, WorkflowStatus, WorkflowStore};

/// Map-backed store with the same contract as the durable backend.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, WorkflowRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn create(&self, record: &WorkflowRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.workflow_id) {
            return Err(StoreError::Conflict {
                workflow_id: record.workflow_id.to_string(),
            });
        }
        records.insert(record.workflow_id, record.clone());
        debug!(workflow_id = %record.workflow_id, "Workflow record created");
        Ok(())
    }

    async fn update(
        &self,
        workflow_id: Uuid,
        payload: &WorkflowPayload,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&workflow_id)
            .ok_or_else(|| StoreError::NotFound {
                workflow_id: workflow_id.to_string(),
            })?;

        record.payload = payload.clone();
        record.status = status;
        record.updated_at = record.updated_at.max(Utc::now());
        debug!(workflow_id = %workflow_id, status = status.as_str(), "Workflow record updated");
        Ok(())
    }

    async fn get(&self, workflow_id: Uuid) -> Result<Option<WorkflowRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(&workflow_id).cloned())
    }

    async fn list(
        &self,
        filter: &ListFilter,
        limit: usize,
    ) -> Result<Vec<WorkflowRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matched: Vec<WorkflowRecord> = records
            .values()
            .filter(|r| {
                filter
                    .tenant_id
                    .as_ref()
                    .is_none_or(|tenant| &r.tenant_id == tenant)
                    && filter.status.is_none_or(|status| r.status == status)
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit);
        Ok(matched)
    }
}
