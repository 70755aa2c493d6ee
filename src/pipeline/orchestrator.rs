//! Pipeline orchestrator — drives a payload through the fixed stage
//! sequence and owns the workflow record lifecycle.
//!
//! Sequencing is fixed: ingestion → triage → worker-or-skip → guardrail
//! (always). Stage failures are contained by the stage contract; the
//! workflow still completes and the guardrail decision reflects the
//! degraded inputs. Only input construction and record-store failures
//! escape to the caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::agents::{
    Agent, GuardrailAgent, IngestionAgent, RiskScorer, SchedulingAgent, SupportAgent, TriageAgent,
};
use crate::connectors::{CalendarConnector, IntentClassifier, KnowledgeBase, ThreadConnector};
use crate::error::{Error, WorkflowError};
use crate::model::{AgentLogEntry, Intent, TenantConfig, WorkflowPayload};
use crate::store::{WorkflowRecord, WorkflowStatus, WorkflowStore};

use super::{WorkflowOutcome, WorkflowRequest};

/// External collaborators and the record store, injected once at
/// construction.
pub struct PipelineDeps {
    pub threads: Arc<dyn ThreadConnector>,
    pub calendar: Arc<dyn CalendarConnector>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    pub risk_scorer: Arc<dyn RiskScorer>,
    pub store: Arc<dyn WorkflowStore>,
}

/// Drives workflow runs. Each run is an independent unit of work; the
/// orchestrator exclusively owns the payload for the duration of a run
/// and is the sole writer of the record's status.
pub struct Orchestrator {
    ingestion: IngestionAgent,
    triage: TriageAgent,
    scheduling: SchedulingAgent,
    support: SupportAgent,
    guardrail: GuardrailAgent,
    store: Arc<dyn WorkflowStore>,
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps, connector_timeout: Duration) -> Self {
        Self {
            ingestion: IngestionAgent::new(deps.threads, connector_timeout),
            triage: TriageAgent::new(deps.classifier, connector_timeout),
            scheduling: SchedulingAgent::new(deps.calendar, connector_timeout),
            support: SupportAgent::new(deps.knowledge_base, connector_timeout),
            guardrail: GuardrailAgent::new(deps.risk_scorer),
            store: deps.store,
        }
    }

    /// Process one inbound message through the full pipeline.
    pub async fn process(&self, request: WorkflowRequest) -> Result<WorkflowOutcome, Error> {
        // Construction failures are fatal and happen before any stage
        // runs or any record is written.
        let mut payload = build_payload(request)?;
        let workflow_id = payload.workflow_id;

        self.store
            .create(&WorkflowRecord::processing(payload.clone()))
            .await?;

        let mut agent_logs = Vec::with_capacity(4);

        let out = self.ingestion.run(payload).await;
        payload = out.payload;
        agent_logs.push(out.log);

        let out = self.triage.run(payload).await;
        payload = out.payload;
        agent_logs.push(out.log);

        // Conditional worker routing — mutually exclusive, selected
        // solely by the classified intent. The worker step always
        // contributes exactly one log entry.
        let worker_log = match payload.classification.as_ref().map(|c| c.intent) {
            Some(Intent::Scheduling) => {
                let out = self.scheduling.run(payload).await;
                payload = out.payload;
                out.log
            }
            Some(Intent::Support) => {
                let out = self.support.run(payload).await;
                payload = out.payload;
                out.log
            }
            Some(intent) => AgentLogEntry::skipped("worker")
                .with_field("reason", format!("no handler for intent: {}", intent.label())),
            None => {
                AgentLogEntry::skipped("worker").with_field("reason", "classification absent")
            }
        };
        agent_logs.push(worker_log);

        // Guardrail always runs, regardless of upstream outcomes.
        let out = self.guardrail.run(payload).await;
        payload = out.payload;
        agent_logs.push(out.log);

        if let Err(e) = self
            .store
            .update(workflow_id, &payload, WorkflowStatus::Completed)
            .await
        {
            error!(workflow_id = %workflow_id, error = %e, "Failed to persist completed workflow");
            let _ = self
                .store
                .update(workflow_id, &payload, WorkflowStatus::Failed)
                .await;
            return Err(e.into());
        }

        emit_automation_event(&payload, &agent_logs);

        Ok(WorkflowOutcome {
            workflow_id,
            decision: payload.qa_decision,
            status: WorkflowStatus::Completed,
            agent_logs,
        })
    }
}

/// Validate the transport request and build the initial payload.
fn build_payload(request: WorkflowRequest) -> Result<WorkflowPayload, WorkflowError> {
    if request.tenant_id.trim().is_empty() {
        return Err(construction("tenant_id must not be empty"));
    }
    if request.source.thread_id.trim().is_empty() {
        return Err(construction("source.thread_id must not be empty"));
    }
    if request.source.message_id.trim().is_empty() {
        return Err(construction("source.message_id must not be empty"));
    }
    if request.contact.email.trim().is_empty() {
        return Err(construction("contact.email must not be empty"));
    }

    let mut tenant_config = request
        .tenant_config
        .unwrap_or_else(|| TenantConfig::for_tenant(&request.tenant_id));
    tenant_config.tenant_id = request.tenant_id;

    if !(0.0..=1.0).contains(&tenant_config.escalation_threshold) {
        return Err(construction("escalation_threshold must be within [0, 1]"));
    }
    if tenant_config.working_hours_start > 23 || tenant_config.working_hours_end > 23 {
        return Err(construction("working hours must be hours of day (0-23)"));
    }

    Ok(WorkflowPayload::new(
        Uuid::new_v4(),
        request.source,
        request.contact,
        request.message,
        tenant_config,
    ))
}

fn construction(reason: &str) -> WorkflowError {
    WorkflowError::Construction {
        reason: reason.to_string(),
    }
}

/// One structured event per finished run, for the audit/observability
/// pipeline.
fn emit_automation_event(payload: &WorkflowPayload, agent_logs: &[AgentLogEntry]) {
    let stages: Vec<String> = agent_logs
        .iter()
        .map(|log| {
            format!(
                "{}:{}",
                log.agent,
                serde_json::to_value(log.status)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default()
            )
        })
        .collect();

    info!(
        workflow_id = %payload.workflow_id,
        correlation_id = %payload.correlation_id,
        tenant_id = %payload.tenant_id,
        intent = payload
            .classification
            .as_ref()
            .map(|c| c.intent.label())
            .unwrap_or("unclassified"),
        decision = payload.qa_decision.map(|d| d.label()).unwrap_or("none"),
        risk_score = payload.qa_risk_score,
        actions = payload.action_plan.len(),
        stages = %stages.join(","),
        "Workflow completed"
    );
}
