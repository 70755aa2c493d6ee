//! QA guardrail stage — the risk-based decision engine.
//!
//! Always runs, regardless of upstream outcomes, and produces exactly
//! one terminal [`QaDecision`]. The decision rule is evaluated in
//! strict first-match order:
//!
//! 1. confidence below the tenant threshold OR risk above 0.7 → escalate
//! 2. auto-send enabled AND risk below 0.3 AND confidence above 0.85 → auto-send
//! 3. otherwise → draft only
//!
//! An unclassified payload escalates unconditionally — the guardrail
//! never silently passes a message triage couldn't classify.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::model::{AgentLogEntry, Intent, QaDecision, TenantConfig, WorkflowPayload};

use super::{Agent, StageOutput};

/// Risk above this always escalates.
const ESCALATE_RISK: f64 = 0.7;
/// Auto-send requires risk below this.
const AUTO_SEND_MAX_RISK: f64 = 0.3;
/// Auto-send requires confidence above this.
const AUTO_SEND_MIN_CONFIDENCE: f64 = 0.85;

/// Pluggable risk scoring function.
///
/// Contract: deterministic given the same payload, result in [0, 1],
/// monotonic in riskier signals (lower confidence, riskier intent,
/// missing context must never lower the score).
pub trait RiskScorer: Send + Sync {
    fn score(&self, payload: &WorkflowPayload) -> f64;
}

/// Default scorer built from coarse, monotone signals.
pub struct HeuristicRiskScorer {
    suspicious: Regex,
}

impl HeuristicRiskScorer {
    pub fn new() -> Self {
        Self {
            suspicious: Regex::new(
                r"(?i)\b(wire transfer|password|bank account|gift ?cards?|crypto(currency)?)\b",
            )
            .unwrap(),
        }
    }
}

impl Default for HeuristicRiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskScorer for HeuristicRiskScorer {
    fn score(&self, payload: &WorkflowPayload) -> f64 {
        let mut score: f64 = 0.1;

        match &payload.classification {
            Some(c) => {
                // Low confidence is the dominant risk signal.
                score += (1.0 - c.confidence) * 0.3;
                score += match c.intent {
                    Intent::Spam => 0.4,
                    Intent::Billing => 0.2,
                    Intent::Other => 0.1,
                    _ => 0.0,
                };
            }
            None => score += 0.5,
        }

        // No thread context means we reply blind.
        if payload.thread_history.is_empty() {
            score += 0.1;
        }

        if self.suspicious.is_match(&payload.message.body_text) {
            score += 0.2;
        }

        score.clamp(0.0, 1.0)
    }
}

/// The decision rule as a pure function of its four inputs.
///
/// Comparison strictness matters at every boundary: confidence exactly
/// at the tenant threshold does not escalate, risk exactly 0.7 does
/// not escalate, risk exactly 0.3 and confidence exactly 0.85 do not
/// qualify for auto-send.
pub fn decide(confidence: f64, risk_score: f64, tenant: &TenantConfig) -> QaDecision {
    if confidence < tenant.escalation_threshold || risk_score > ESCALATE_RISK {
        QaDecision::Escalate
    } else if tenant.auto_send_enabled
        && risk_score < AUTO_SEND_MAX_RISK
        && confidence > AUTO_SEND_MIN_CONFIDENCE
    {
        QaDecision::AutoSend
    } else {
        QaDecision::DraftOnly
    }
}

/// Terminal guardrail stage.
pub struct GuardrailAgent {
    scorer: Arc<dyn RiskScorer>,
}

impl GuardrailAgent {
    pub fn new(scorer: Arc<dyn RiskScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl Agent for GuardrailAgent {
    fn name(&self) -> &'static str {
        "qa_guardrail"
    }

    async fn run(&self, mut payload: WorkflowPayload) -> StageOutput {
        // The decision is terminal. A payload that already carries one
        // is left untouched; re-running a workflow means a new id.
        if payload.qa_decision.is_some() {
            payload.touch();
            let log = AgentLogEntry::skipped(self.name())
                .with_field("reason", "decision already recorded");
            return StageOutput { payload, log };
        }

        let risk_score = self.scorer.score(&payload).clamp(0.0, 1.0);
        payload.qa_risk_score = Some(risk_score);

        let (decision, log) = match &payload.classification {
            Some(classification) => {
                let decision = decide(classification.confidence, risk_score, &payload.tenant_config);
                let log = AgentLogEntry::completed(self.name())
                    .with_field("risk_score", risk_score)
                    .with_field("decision", decision.label());
                (decision, log)
            }
            // Unclassified payloads can never pass; escalate regardless
            // of the tenant threshold.
            None => {
                let log = AgentLogEntry::completed(self.name())
                    .with_field("risk_score", risk_score)
                    .with_field("decision", QaDecision::Escalate.label())
                    .with_field("reason", "classification absent");
                (QaDecision::Escalate, log)
            }
        };

        payload.qa_decision = Some(decision);
        payload.touch();
        StageOutput { payload, log }
    }
}
