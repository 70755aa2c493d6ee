//! Workflow pipeline — request/outcome types and the orchestrator.

pub mod orchestrator;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AgentLogEntry, Contact, InboundMessage, MessageSource, QaDecision, TenantConfig};
use crate::store::WorkflowStatus;

pub use orchestrator::{Orchestrator, PipelineDeps};

/// Inbound request at the transport boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub tenant_id: String,
    pub source: MessageSource,
    pub contact: Contact,
    pub message: InboundMessage,
    /// Tenant policy overrides; unset fields take the defaults.
    #[serde(default)]
    pub tenant_config: Option<TenantConfig>,
}

/// Result of one workflow run, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub workflow_id: Uuid,
    pub decision: Option<QaDecision>,
    pub status: WorkflowStatus,
    pub agent_logs: Vec<AgentLogEntry>,
}
