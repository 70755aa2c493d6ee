//! Triage stage — classify intent and priority.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::connectors::IntentClassifier;
use crate::model::AgentLogEntry;

use super::{Agent, StageOutput, bounded};

/// Produces a `Classification` via the classification service.
///
/// On failure the payload carries no classification; downstream routing
/// treats absence as "no handler" and the guardrail escalates (an
/// unclassified message can never pass).
pub struct TriageAgent {
    classifier: Arc<dyn IntentClassifier>,
    call_timeout: Duration,
}

impl TriageAgent {
    pub fn new(classifier: Arc<dyn IntentClassifier>, call_timeout: Duration) -> Self {
        Self {
            classifier,
            call_timeout,
        }
    }
}

#[async_trait]
impl Agent for TriageAgent {
    fn name(&self) -> &'static str {
        "triage"
    }

    async fn run(&self, mut payload: crate::model::WorkflowPayload) -> StageOutput {
        let classified = bounded(
            "classifier",
            self.call_timeout,
            self.classifier.classify(
                &payload.message,
                &payload.thread_history,
                &payload.tenant_config,
            ),
        )
        .await;

        let log = match classified {
            Ok(mut classification) => {
                classification.confidence = classification.confidence.clamp(0.0, 1.0);
                let log = AgentLogEntry::completed(self.name())
                    .with_field("intent", classification.intent.label())
                    .with_field("confidence", classification.confidence);
                payload.classification = Some(classification);
                log
            }
            Err(e) => {
                warn!(
                    workflow_id = %payload.workflow_id,
                    error = %e,
                    "Classification failed, payload remains unclassified"
                );
                AgentLogEntry::failed(self.name(), e.to_string())
            }
        };

        payload.touch();
        StageOutput { payload, log }
    }
}
