//! Support worker — answer from the knowledge base.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::connectors::{KbMatch, KnowledgeBase};
use crate::model::{Action, AgentLogEntry, Intent};

use super::{Agent, StageOutput, bounded};

/// How many knowledge-base matches feed the drafted answer.
const KB_TOP_K: usize = 2;

/// Handles `Intent::Support` messages: searches the knowledge base and
/// appends exactly one reply action with the drafted answer.
pub struct SupportAgent {
    kb: Arc<dyn KnowledgeBase>,
    call_timeout: Duration,
}

impl SupportAgent {
    pub fn new(kb: Arc<dyn KnowledgeBase>, call_timeout: Duration) -> Self {
        Self { kb, call_timeout }
    }
}

#[async_trait]
impl Agent for SupportAgent {
    fn name(&self) -> &'static str {
        "support"
    }

    async fn run(&self, mut payload: crate::model::WorkflowPayload) -> StageOutput {
        let matches = payload
            .classification
            .as_ref()
            .is_some_and(|c| c.intent == Intent::Support);
        if !matches {
            payload.touch();
            let log = AgentLogEntry::skipped(self.name()).with_field("skipped", true);
            return StageOutput { payload, log };
        }

        let searched = bounded(
            "knowledge-base",
            self.call_timeout,
            self.kb.search(&payload.message.body_text, KB_TOP_K),
        )
        .await;

        let log = match searched {
            Ok(kb_matches) => {
                let body = draft_support_answer(
                    payload.contact.name.as_deref(),
                    &kb_matches,
                    &payload.tenant_config.tone,
                );
                payload
                    .action_plan
                    .push(Action::reply(&payload.source.channel, body));
                AgentLogEntry::completed(self.name()).with_field("kb_matches", kb_matches.len())
            }
            Err(e) => {
                warn!(
                    workflow_id = %payload.workflow_id,
                    error = %e,
                    "Knowledge-base lookup failed, no answer drafted"
                );
                AgentLogEntry::failed(self.name(), e.to_string())
            }
        };

        payload.touch();
        StageOutput { payload, log }
    }
}

/// Draft the answer from KB matches in the tenant's tone.
fn draft_support_answer(contact_name: Option<&str>, matches: &[KbMatch], tone: &str) -> String {
    let greeting = match (tone, contact_name) {
        ("friendly" | "casual", Some(name)) => format!("Hi {name}!"),
        ("friendly" | "casual", None) => "Hi there!".to_string(),
        (_, Some(name)) => format!("Hello {name},"),
        (_, None) => "Hello,".to_string(),
    };

    if matches.is_empty() {
        return format!(
            "{greeting}\n\nThanks for getting in touch. I've passed your question \
             to the team and someone will get back to you shortly."
        );
    }

    let mut body = format!("{greeting}\n\nBased on your question, here is what I found:\n");
    for kb_match in matches {
        body.push_str(&format!("\n{}\n{}\n", kb_match.title, kb_match.excerpt));
    }
    body.push_str("\nIf that doesn't cover it, just reply and we'll dig further.");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::StaticKnowledgeBase;
    use crate::error::ConnectorError;
    use crate::model::{
        AgentStatus, Classification, Contact, InboundMessage, MessageSource, Priority,
        TenantConfig, WorkflowPayload,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn payload(intent: Option<Intent>, body: &str) -> WorkflowPayload {
        let mut p = WorkflowPayload::new(
            Uuid::new_v4(),
            MessageSource {
                channel: "email".into(),
                thread_id: "t1".into(),
                message_id: "m1".into(),
            },
            Contact {
                email: "bob@example.com".into(),
                name: Some("Bob".into()),
                org_id: None,
            },
            InboundMessage {
                subject: "Help".into(),
                body_text: body.into(),
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

    /// Knowledge base that always fails.
    struct BrokenKb;

    #[async_trait]
    impl KnowledgeBase for BrokenKb {
        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<KbMatch>, ConnectorError> {
            Err(ConnectorError::RequestFailed {
                connector: "knowledge-base".into(),
                reason: "index offline".into(),
            })
        }
    }

    #[tokio::test]
    async fn drafts_answer_from_kb_matches() {
        let agent = SupportAgent::new(
            Arc::new(StaticKnowledgeBase::with_default_entries()),
            Duration::from_secs(1),
        );
        let out = agent
            .run(payload(Some(Intent::Support), "how do I reset my password?"))
            .await;

        assert_eq!(out.log.status, AgentStatus::Completed);
        assert_eq!(out.log.fields["kb_matches"], 1);
        assert_eq!(out.payload.action_plan.len(), 1);
        let body = out.payload.action_plan[0].tool_args["body"].as_str().unwrap();
        assert!(body.contains("Resetting your password"));
    }

    #[tokio::test]
    async fn no_match_still_drafts_fallback_reply() {
        let agent = SupportAgent::new(
            Arc::new(StaticKnowledgeBase::with_default_entries()),
            Duration::from_secs(1),
        );
        let out = agent
            .run(payload(Some(Intent::Support), "zzz qqq xyzzy"))
            .await;

        assert_eq!(out.log.status, AgentStatus::Completed);
        assert_eq!(out.log.fields["kb_matches"], 0);
        assert_eq!(out.payload.action_plan.len(), 1);
        let body = out.payload.action_plan[0].tool_args["body"].as_str().unwrap();
        assert!(body.contains("passed your question"));
    }

    #[tokio::test]
    async fn skips_non_matching_intent() {
        let agent = SupportAgent::new(
            Arc::new(StaticKnowledgeBase::with_default_entries()),
            Duration::from_secs(1),
        );
        let out = agent
            .run(payload(Some(Intent::Scheduling), "meeting please"))
            .await;

        assert_eq!(out.log.status, AgentStatus::Skipped);
        assert_eq!(out.log.fields["skipped"], true);
        assert!(out.payload.action_plan.is_empty());
    }

    #[tokio::test]
    async fn kb_failure_is_contained() {
        let agent = SupportAgent::new(Arc::new(BrokenKb), Duration::from_secs(1));
        let out = agent.run(payload(Some(Intent::Support), "help me")).await;

        assert_eq!(out.log.status, AgentStatus::Failed);
        assert!(out.log.error.as_deref().unwrap().contains("index offline"));
        assert!(out.payload.action_plan.is_empty());
    }
}
