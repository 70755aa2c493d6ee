//! libSQL backend — durable `WorkflowStore` implementation.
//!
//! Supports local file and in-memory databases. Payload snapshots are
//! stored as a JSON column; timestamps are RFC 3339 strings.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::WorkflowPayload;

use super::{ListFilter, WorkflowRecord, WorkflowStatus, WorkflowStore};

const WORKFLOW_COLUMNS: &str =
    "workflow_id, tenant_id, payload, status, created_at, updated_at";

/// libSQL-backed workflow store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async
/// use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run the schema setup.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Workflow database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests and ephemeral runs).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS workflows (
                    workflow_id TEXT PRIMARY KEY,
                    tenant_id   TEXT NOT NULL,
                    payload     TEXT NOT NULL,
                    status      TEXT NOT NULL,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("create table: {e}")))?;
        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_workflows_tenant ON workflows(tenant_id)",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("create tenant index: {e}")))?;
        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_workflows_created ON workflows(created_at)",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("create created index: {e}")))?;
        Ok(())
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn row_to_record(row: &libsql::Row) -> Result<WorkflowRecord, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("workflow_id column: {e}")))?;
    let tenant_id: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("tenant_id column: {e}")))?;
    let payload_str: String = row
        .get(2)
        .map_err(|e| StoreError::Query(format!("payload column: {e}")))?;
    let status_str: String = row
        .get(3)
        .map_err(|e| StoreError::Query(format!("status column: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| StoreError::Query(format!("created_at column: {e}")))?;
    let updated_str: String = row
        .get(5)
        .map_err(|e| StoreError::Query(format!("updated_at column: {e}")))?;

    let workflow_id = Uuid::parse_str(&id_str)
        .map_err(|e| StoreError::Serialization(format!("workflow_id '{id_str}': {e}")))?;
    let payload: WorkflowPayload = serde_json::from_str(&payload_str)
        .map_err(|e| StoreError::Serialization(format!("payload snapshot: {e}")))?;
    let status = WorkflowStatus::parse(&status_str).ok_or_else(|| {
        StoreError::Serialization(format!("unknown workflow status '{status_str}'"))
    })?;

    Ok(WorkflowRecord {
        workflow_id,
        tenant_id,
        payload,
        status,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl WorkflowStore for LibSqlStore {
    async fn create(&self, record: &WorkflowRecord) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::Serialization(format!("payload snapshot: {e}")))?;

        let result = self
            .conn()
            .execute(
                "INSERT INTO workflows (workflow_id, tenant_id, payload, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.workflow_id.to_string(),
                    record.tenant_id.clone(),
                    payload_json,
                    record.status.as_str(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .await;

        match result {
            Ok(_) => {
                debug!(workflow_id = %record.workflow_id, "Workflow record created");
                Ok(())
            }
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(StoreError::Conflict {
                    workflow_id: record.workflow_id.to_string(),
                })
            }
            Err(e) => Err(StoreError::Query(format!("create: {e}"))),
        }
    }

    async fn update(
        &self,
        workflow_id: Uuid,
        payload: &WorkflowPayload,
        status: WorkflowStatus,
    ) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(payload)
            .map_err(|e| StoreError::Serialization(format!("payload snapshot: {e}")))?;
        let now = Utc::now().to_rfc3339();

        let affected = self
            .conn()
            .execute(
                "UPDATE workflows SET payload = ?1, status = ?2, updated_at = ?3 WHERE workflow_id = ?4",
                params![payload_json, status.as_str(), now, workflow_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("update: {e}")))?;

        if affected == 0 {
            return Err(StoreError::NotFound {
                workflow_id: workflow_id.to_string(),
            });
        }
        debug!(workflow_id = %workflow_id, status = status.as_str(), "Workflow record updated");
        Ok(())
    }

    async fn get(&self, workflow_id: Uuid) -> Result<Option<WorkflowRecord>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE workflow_id = ?1"),
                params![workflow_id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get: {e}"))),
        }
    }

    async fn list(
        &self,
        filter: &ListFilter,
        limit: usize,
    ) -> Result<Vec<WorkflowRecord>, StoreError> {
        let order = "ORDER BY created_at DESC LIMIT";
        let mut rows = match (&filter.tenant_id, filter.status) {
            (Some(tenant), Some(status)) => self
                .conn()
                .query(
                    &format!(
                        "SELECT {WORKFLOW_COLUMNS} FROM workflows \
                         WHERE tenant_id = ?1 AND status = ?2 {order} ?3"
                    ),
                    params![tenant.clone(), status.as_str(), limit as i64],
                )
                .await,
            (Some(tenant), None) => self
                .conn()
                .query(
                    &format!(
                        "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE tenant_id = ?1 {order} ?2"
                    ),
                    params![tenant.clone(), limit as i64],
                )
                .await,
            (None, Some(status)) => self
                .conn()
                .query(
                    &format!(
                        "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE status = ?1 {order} ?2"
                    ),
                    params![status.as_str(), limit as i64],
                )
                .await,
            (None, None) => self
                .conn()
                .query(
                    &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows {order} ?1"),
                    params![limit as i64],
                )
                .await,
        }
        .map_err(|e| StoreError::Query(format!("list: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_record(&row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping workflow row: {e}");
                }
            }
        }
        Ok(records)
    }
}
