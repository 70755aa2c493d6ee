//! Shared types for the workflow pipeline.
//!
//! A `WorkflowPayload` is built from the transport request, threaded
//! through the agent pipeline (ingestion → triage → worker → guardrail),
//! and snapshotted into the record store after every run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Contact & message ───────────────────────────────────────────────

/// The sender of an inbound message. Immutable once attached to a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

/// One inbound unit of communication (email-like). Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub subject: String,
    pub body_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    pub received_at: DateTime<Utc>,
    pub message_id: String,
    pub thread_id: String,
}

/// Ordered thread context, insertion order = chronological.
///
/// Mutated only by the ingestion stage; downstream stages must tolerate
/// an empty or stale history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadHistory {
    pub messages: Vec<InboundMessage>,
}

impl ThreadHistory {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Channel descriptor for the inbound message: where it came from and
/// which thread/message it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSource {
    pub channel: String,
    pub thread_id: String,
    pub message_id: String,
}

// ── Classification ──────────────────────────────────────────────────

/// Classified intent of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Scheduling,
    Support,
    Billing,
    Lead,
    Other,
    Spam,
}

impl Intent {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduling => "scheduling",
            Self::Support => "support",
            Self::Billing => "billing",
            Self::Lead => "lead",
            Self::Other => "other",
            Self::Spam => "spam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

/// Triage output. Set once by the triage stage, read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_intent: Option<String>,
    pub priority: Priority,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
}

// ── Actions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Completed,
    Failed,
}

/// A proposed action on the plan (e.g. send a reply).
///
/// Appended by worker agents, never removed. Execution and completion
/// marking belong to a layer outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_args: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
    pub status: ActionStatus,
}

impl Action {
    /// A pending reply action routed through the given tool/channel.
    pub fn reply(tool_name: &str, body: String) -> Self {
        let mut tool_args = serde_json::Map::new();
        tool_args.insert("body".into(), serde_json::Value::String(body));
        Self {
            action_type: "reply".into(),
            tool_name: Some(tool_name.to_string()),
            tool_args,
            result_id: None,
            status: ActionStatus::Pending,
        }
    }
}

// ── Tenant policy ───────────────────────────────────────────────────

/// Per-tenant policy. Loaded once per workflow invocation and treated
/// as an immutable input by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Hour of day (0-23).
    #[serde(default = "default_hours_start")]
    pub working_hours_start: u8,
    #[serde(default = "default_hours_end")]
    pub working_hours_end: u8,
    /// Weekdays, 0 = Monday.
    #[serde(default = "default_working_days")]
    pub working_days: Vec<u8>,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default)]
    pub auto_send_enabled: bool,
    /// Classification confidence below this escalates, in [0, 1].
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: f64,
}

fn default_timezone() -> String {
    "Europe/London".into()
}
fn default_hours_start() -> u8 {
    9
}
fn default_hours_end() -> u8 {
    17
}
fn default_working_days() -> Vec<u8> {
    vec![0, 1, 2, 3, 4]
}
fn default_tone() -> String {
    "professional".into()
}
fn default_escalation_threshold() -> f64 {
    0.7
}

impl TenantConfig {
    /// Default policy for a tenant with no stored configuration.
    pub fn for_tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            timezone: default_timezone(),
            working_hours_start: default_hours_start(),
            working_hours_end: default_hours_end(),
            working_days: default_working_days(),
            tone: default_tone(),
            auto_send_enabled: false,
            escalation_threshold: default_escalation_threshold(),
        }
    }
}

// ── QA decision ─────────────────────────────────────────────────────

/// Terminal guardrail decision for a workflow run. Set exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaDecision {
    AutoSend,
    DraftOnly,
    Escalate,
}

impl QaDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AutoSend => "auto_send",
            Self::DraftOnly => "draft_only",
            Self::Escalate => "escalate",
        }
    }
}

// ── Agent log ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

/// Per-stage audit record, immutable once written.
///
/// `fields` carries stage-specific derived values (messages_fetched,
/// intent, risk_score, ...) so the audit trail stays queryable without
/// a schema per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogEntry {
    pub agent: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentLogEntry {
    pub fn completed(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            status: AgentStatus::Completed,
            fields: serde_json::Map::new(),
            error: None,
        }
    }

    pub fn failed(agent: &str, error: impl Into<String>) -> Self {
        Self {
            agent: agent.to_string(),
            status: AgentStatus::Failed,
            fields: serde_json::Map::new(),
            error: Some(error.into()),
        }
    }

    pub fn skipped(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            status: AgentStatus::Skipped,
            fields: serde_json::Map::new(),
            error: None,
        }
    }

    /// Attach a stage-specific derived field.
    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

// ── Workflow payload ────────────────────────────────────────────────

/// The aggregate root threaded through the pipeline.
///
/// Invariants:
/// - `updated_at` monotonically non-decreases across stage executions
///   (every stage calls [`WorkflowPayload::touch`] regardless of outcome);
/// - `qa_decision` is set at most once, by the guardrail;
/// - `action_plan` entries are appended only by the worker matching the
///   classified intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub workflow_id: Uuid,
    pub tenant_id: String,
    /// Correlation id for distributed tracing.
    pub correlation_id: String,

    // Input
    pub source: MessageSource,
    pub contact: Contact,
    pub message: InboundMessage,
    pub thread_history: ThreadHistory,
    pub tenant_config: TenantConfig,

    // Enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_decision: Option<QaDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_risk_score: Option<f64>,

    // Output
    #[serde(default)]
    pub action_plan: Vec<Action>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowPayload {
    /// Build a fresh payload for a new workflow run.
    pub fn new(
        workflow_id: Uuid,
        source: MessageSource,
        contact: Contact,
        message: InboundMessage,
        tenant_config: TenantConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            workflow_id,
            tenant_id: tenant_config.tenant_id.clone(),
            correlation_id: workflow_id.to_string(),
            source,
            contact,
            message,
            thread_history: ThreadHistory::default(),
            tenant_config,
            classification: None,
            qa_decision: None,
            qa_risk_score: None,
            action_plan: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` without ever moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> WorkflowPayload {
        WorkflowPayload::new(
            Uuid::new_v4(),
            MessageSource {
                channel: "email".into(),
                thread_id: "thread-1".into(),
                message_id: "msg-1".into(),
            },
            Contact {
                email: "alice@example.com".into(),
                name: Some("Alice".into()),
                org_id: None,
            },
            InboundMessage {
                subject: "Meeting next week?".into(),
                body_text: "Can we find a time on Tuesday?".into(),
                body_html: None,
                received_at: Utc::now(),
                message_id: "msg-1".into(),
                thread_id: "thread-1".into(),
            },
            TenantConfig::for_tenant("acme"),
        )
    }

    #[test]
    fn new_payload_starts_empty() {
        let payload = sample_payload();
        assert_eq!(payload.tenant_id, "acme");
        assert_eq!(payload.correlation_id, payload.workflow_id.to_string());
        assert!(payload.classification.is_none());
        assert!(payload.qa_decision.is_none());
        assert!(payload.action_plan.is_empty());
        assert!(payload.thread_history.is_empty());
        assert_eq!(payload.created_at, payload.updated_at);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut payload = sample_payload();
        payload.updated_at = Utc::now() + chrono::Duration::hours(1);
        let before = payload.updated_at;
        payload.touch();
        assert_eq!(payload.updated_at, before);

        payload.updated_at = Utc::now() - chrono::Duration::hours(1);
        payload.touch();
        assert!(payload.updated_at > before - chrono::Duration::hours(2));
        assert!(payload.updated_at >= Utc::now() - chrono::Duration::seconds(1));
    }

    #[test]
    fn tenant_config_defaults() {
        let config = TenantConfig::for_tenant("acme");
        assert_eq!(config.timezone, "Europe/London");
        assert_eq!(config.working_hours_start, 9);
        assert_eq!(config.working_hours_end, 17);
        assert_eq!(config.working_days, vec![0, 1, 2, 3, 4]);
        assert!(!config.auto_send_enabled);
        assert!((config.escalation_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn tenant_config_partial_deserialization_fills_defaults() {
        let config: TenantConfig =
            serde_json::from_str(r#"{"auto_send_enabled": true, "escalation_threshold": 0.5}"#)
                .unwrap();
        assert!(config.auto_send_enabled);
        assert!((config.escalation_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.tone, "professional");
        assert_eq!(config.working_hours_end, 17);
    }

    #[test]
    fn reply_action_shape() {
        let action = Action::reply("email", "Here are some times...".into());
        assert_eq!(action.action_type, "reply");
        assert_eq!(action.tool_name.as_deref(), Some("email"));
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(
            action.tool_args.get("body").and_then(|v| v.as_str()),
            Some("Here are some times...")
        );
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(Intent::Scheduling).unwrap(),
            serde_json::json!("scheduling")
        );
        assert_eq!(
            serde_json::to_value(QaDecision::AutoSend).unwrap(),
            serde_json::json!("auto_send")
        );
        assert_eq!(
            serde_json::to_value(AgentStatus::Skipped).unwrap(),
            serde_json::json!("skipped")
        );
        assert_eq!(
            serde_json::to_value(Priority::Critical).unwrap(),
            serde_json::json!("critical")
        );
    }

    #[test]
    fn log_entry_builder() {
        let entry = AgentLogEntry::completed("triage")
            .with_field("intent", "scheduling")
            .with_field("confidence", 0.85);
        assert_eq!(entry.agent, "triage");
        assert_eq!(entry.status, AgentStatus::Completed);
        assert_eq!(entry.fields["intent"], "scheduling");
        assert!(entry.error.is_none());

        let failed = AgentLogEntry::failed("ingestion", "connector down");
        assert_eq!(failed.status, AgentStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("connector down"));
    }

    #[test]
    fn payload_roundtrips_through_json() {
        let mut payload = sample_payload();
        payload.classification = Some(Classification {
            intent: Intent::Support,
            sub_intent: Some("password_reset".into()),
            priority: Priority::High,
            confidence: 0.92,
        });
        payload.qa_decision = Some(QaDecision::DraftOnly);
        payload.qa_risk_score = Some(0.4);
        payload.action_plan.push(Action::reply("email", "draft".into()));

        let json = serde_json::to_string(&payload).unwrap();
        let back: WorkflowPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workflow_id, payload.workflow_id);
        assert_eq!(back.qa_decision, Some(QaDecision::DraftOnly));
        assert_eq!(back.action_plan.len(), 1);
        assert_eq!(
            back.classification.as_ref().unwrap().intent,
            Intent::Support
        );
    }
}
