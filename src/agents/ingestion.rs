//! Ingestion stage — materialize full thread context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::connectors::ThreadConnector;
use crate::model::AgentLogEntry;

use super::{Agent, StageOutput, bounded};

/// Fetches thread history from the transport connector and replaces
/// `thread_history` on the payload. Connector failure is logged and
/// tolerated — downstream stages work with the empty/stale history.
pub struct IngestionAgent {
    threads: Arc<dyn ThreadConnector>,
    call_timeout: Duration,
}

impl IngestionAgent {
    pub fn new(threads: Arc<dyn ThreadConnector>, call_timeout: Duration) -> Self {
        Self {
            threads,
            call_timeout,
        }
    }
}

#[async_trait]
impl Agent for IngestionAgent {
    fn name(&self) -> &'static str {
        "ingestion"
    }

    async fn run(&self, mut payload: crate::model::WorkflowPayload) -> StageOutput {
        let fetched = bounded(
            "thread",
            self.call_timeout,
            self.threads
                .fetch(&payload.source.thread_id, &payload.tenant_id),
        )
        .await;

        let log = match fetched {
            Ok(history) => {
                payload.thread_history = history;
                AgentLogEntry::completed(self.name())
                    .with_field("messages_fetched", payload.thread_history.len())
            }
            Err(e) => {
                warn!(
                    workflow_id = %payload.workflow_id,
                    thread_id = %payload.source.thread_id,
                    error = %e,
                    "Thread fetch failed, continuing with existing history"
                );
                AgentLogEntry::failed(self.name(), e.to_string())
            }
        };

        payload.touch();
        StageOutput { payload, log }
    }
}
