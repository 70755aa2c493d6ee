//! Pipeline stages ("agents") and their shared contract.
//!
//! Every stage is a transformation from payload to payload plus one
//! audit log entry. A stage must never let an error escape its own
//! boundary: internal failures (connector errors, timeouts, missing
//! data) become a `Failed` log entry and the payload comes back
//! otherwise unmodified. Every stage bumps `updated_at` regardless of
//! outcome, and a stage whose applicability guard does not match
//! returns `Skipped` without touching any enrichment field.

pub mod guardrail;
pub mod ingestion;
pub mod scheduling;
pub mod support;
pub mod triage;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::model::{AgentLogEntry, WorkflowPayload};

pub use guardrail::{GuardrailAgent, HeuristicRiskScorer, RiskScorer, decide};
pub use ingestion::IngestionAgent;
pub use scheduling::SchedulingAgent;
pub use support::SupportAgent;
pub use triage::TriageAgent;

/// Result of one stage execution.
pub struct StageOutput {
    pub payload: WorkflowPayload,
    pub log: AgentLogEntry,
}

/// Uniform stage interface.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stage name used in audit log entries.
    fn name(&self) -> &'static str;

    /// Run the stage. Infallible by contract — failures are reported
    /// through the log entry, never by panicking or returning an error.
    async fn run(&self, payload: WorkflowPayload) -> StageOutput;
}

/// Apply the per-call bound to an external connector call.
///
/// Expiry surfaces as a `ConnectorError::Timeout`, which the calling
/// stage converts into a failed log entry like any other connector
/// failure.
pub(crate) async fn bounded<T, F>(
    connector: &str,
    timeout: Duration,
    call: F,
) -> Result<T, ConnectorError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ConnectorError::Timeout {
            connector: connector.to_string(),
            timeout,
        }),
    }
}
