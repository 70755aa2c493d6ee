//! Scheduling worker — propose times and draft a reply.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::connectors::{CalendarConnector, TimeSlot};
use crate::model::{Action, AgentLogEntry, Intent};

use super::{Agent, StageOutput, bounded};

/// Number of slots proposed per reply.
const NUM_SLOTS: usize = 3;
/// Proposed meeting length in minutes.
const SLOT_DURATION_MINUTES: u32 = 30;
/// How far ahead the calendar is searched.
const DAYS_AHEAD: u32 = 7;

/// Handles `Intent::Scheduling` messages: gathers available slots and
/// appends exactly one reply action proposing them.
pub struct SchedulingAgent {
    calendar: Arc<dyn CalendarConnector>,
    call_timeout: Duration,
}

impl SchedulingAgent {
    pub fn new(calendar: Arc<dyn CalendarConnector>, call_timeout: Duration) -> Self {
        Self {
            calendar,
            call_timeout,
        }
    }
}

#[async_trait]
impl Agent for SchedulingAgent {
    fn name(&self) -> &'static str {
        "scheduling"
    }

    async fn run(&self, mut payload: crate::model::WorkflowPayload) -> StageOutput {
        // Guard clause: this worker only fires for scheduling intents.
        let matches = payload
            .classification
            .as_ref()
            .is_some_and(|c| c.intent == Intent::Scheduling);
        if !matches {
            payload.touch();
            let log = AgentLogEntry::skipped(self.name()).with_field("skipped", true);
            return StageOutput { payload, log };
        }

        let found = bounded(
            "calendar",
            self.call_timeout,
            self.calendar.find_slots(
                &payload.tenant_config,
                NUM_SLOTS,
                SLOT_DURATION_MINUTES,
                DAYS_AHEAD,
            ),
        )
        .await;

        let log = match found {
            Ok(slots) => {
                let body = draft_scheduling_reply(
                    payload.contact.name.as_deref(),
                    &slots,
                    &payload.tenant_config.tone,
                );
                payload
                    .action_plan
                    .push(Action::reply(&payload.source.channel, body));
                AgentLogEntry::completed(self.name()).with_field("slots_proposed", slots.len())
            }
            Err(e) => {
                warn!(
                    workflow_id = %payload.workflow_id,
                    error = %e,
                    "Calendar lookup failed, no reply drafted"
                );
                AgentLogEntry::failed(self.name(), e.to_string())
            }
        };

        payload.touch();
        StageOutput { payload, log }
    }
}

/// Draft the proposal reply in the tenant's tone.
fn draft_scheduling_reply(contact_name: Option<&str>, slots: &[TimeSlot], tone: &str) -> String {
    let greeting = match (tone, contact_name) {
        ("friendly" | "casual", Some(name)) => format!("Hi {name}!"),
        ("friendly" | "casual", None) => "Hi there!".to_string(),
        (_, Some(name)) => format!("Hello {name},"),
        (_, None) => "Hello,".to_string(),
    };

    if slots.is_empty() {
        return format!(
            "{greeting}\n\nThank you for reaching out. I couldn't find an open slot \
             in the coming days, but I'll follow up shortly with some options."
        );
    }

    let mut body = format!(
        "{greeting}\n\nThank you for reaching out. Here are some times that work:\n"
    );
    for slot in slots {
        body.push_str(&format!(
            "- {} ({} min, {})\n",
            slot.start_time.format("%A %-d %B at %H:%M"),
            slot.duration_minutes,
            slot.timezone
        ));
    }
    body.push_str("\nLet me know which suits you best.");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::WorkingHoursCalendar;
    use crate::error::ConnectorError;
    use crate::model::{
        ActionStatus, AgentStatus, Classification, Contact, InboundMessage, MessageSource,
        Priority, TenantConfig, WorkflowPayload,
    };
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn payload(intent: Option<Intent>) -> WorkflowPayload {
        let mut p = WorkflowPayload::new(
            Uuid::new_v4(),
            MessageSource {
                channel: "email".into(),
                thread_id: "t1".into(),
                message_id: "m1".into(),
            },
            Contact {
                email: "alice@example.com".into(),
                name: Some("Alice".into()),
                org_id: None,
            },
            InboundMessage {
                subject: "Meeting?".into(),
                body_text: "Can we find a slot?".into(),
                body_html: None,
                received_at: Utc::now(),
                message_id: "m1".into(),
                thread_id: "t1".into(),
            },
            TenantConfig::for_tenant("acme"),
        );
        p.classification = intent.map(|intent| Classification {
            intent,
            sub_intent: None,
            priority: Priority::Normal,
            confidence: 0.9,
        });
        p
    }

    /// Calendar that always fails.
    struct BrokenCalendar;

    #[async_trait]
    impl CalendarConnector for BrokenCalendar {
        async fn find_slots(
            &self,
            _tenant_config: &TenantConfig,
            _num_slots: usize,
            _duration_minutes: u32,
            _days_ahead: u32,
        ) -> Result<Vec<TimeSlot>, ConnectorError> {
            Err(ConnectorError::Unavailable {
                connector: "calendar".into(),
                reason: "freebusy query failed".into(),
            })
        }

        async fn create_event(
            &self,
            _tenant_id: &str,
            _title: &str,
            _start_time: DateTime<Utc>,
            _duration_minutes: u32,
            _attendees: &[String],
        ) -> Result<String, ConnectorError> {
            unreachable!("not used in these tests")
        }

        async fn check_availability(
            &self,
            _tenant_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<bool, ConnectorError> {
            unreachable!("not used in these tests")
        }
    }

    #[tokio::test]
    async fn appends_exactly_one_reply_action() {
        let agent = SchedulingAgent::new(
            Arc::new(WorkingHoursCalendar::new()),
            Duration::from_secs(1),
        );
        let out = agent.run(payload(Some(Intent::Scheduling))).await;

        assert_eq!(out.log.status, AgentStatus::Completed);
        assert_eq!(out.payload.action_plan.len(), 1);
        let action = &out.payload.action_plan[0];
        assert_eq!(action.action_type, "reply");
        assert_eq!(action.tool_name.as_deref(), Some("email"));
        assert_eq!(action.status, ActionStatus::Pending);
        let body = action.tool_args["body"].as_str().unwrap();
        assert!(body.contains("Hello Alice"));
        assert!(body.contains("times that work"));
    }

    #[tokio::test]
    async fn skips_non_matching_intent() {
        let agent = SchedulingAgent::new(
            Arc::new(WorkingHoursCalendar::new()),
            Duration::from_secs(1),
        );
        let out = agent.run(payload(Some(Intent::Support))).await;

        assert_eq!(out.log.status, AgentStatus::Skipped);
        assert_eq!(out.log.fields["skipped"], true);
        assert!(out.payload.action_plan.is_empty());
    }

    #[tokio::test]
    async fn skips_when_unclassified() {
        let agent = SchedulingAgent::new(
            Arc::new(WorkingHoursCalendar::new()),
            Duration::from_secs(1),
        );
        let out = agent.run(payload(None)).await;
        assert_eq!(out.log.status, AgentStatus::Skipped);
        assert!(out.payload.action_plan.is_empty());
    }

    #[tokio::test]
    async fn calendar_failure_drafts_nothing() {
        let agent = SchedulingAgent::new(Arc::new(BrokenCalendar), Duration::from_secs(1));
        let out = agent.run(payload(Some(Intent::Scheduling))).await;

        assert_eq!(out.log.status, AgentStatus::Failed);
        assert!(out.payload.action_plan.is_empty());
    }

    #[test]
    fn friendly_tone_changes_greeting() {
        let body = draft_scheduling_reply(Some("Bob"), &[], "friendly");
        assert!(body.starts_with("Hi Bob!"));

        let body = draft_scheduling_reply(None, &[], "professional");
        assert!(body.starts_with("Hello,"));
    }
}
