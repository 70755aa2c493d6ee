//! Default in-process connector implementations.
//!
//! These are the implementations `main` wires up when no real transport
//! is configured. They are deterministic so pipeline behavior stays
//! reproducible in tests and demos:
//! - `StaticThreadConnector` serves canned thread history
//! - `WorkingHoursCalendar` computes slots from the tenant policy
//! - `RuleClassifier` matches compiled keyword patterns, first match wins
//! - `StaticKnowledgeBase` scores seeded entries by token overlap

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Utc};
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::error::ConnectorError;
use crate::model::{
    Classification, InboundMessage, Intent, Priority, TenantConfig, ThreadHistory,
};

use super::{CalendarConnector, IntentClassifier, KbMatch, KnowledgeBase, ThreadConnector, TimeSlot};

// ── Thread connector ────────────────────────────────────────────────

/// Thread transport backed by canned per-thread history.
///
/// `fetch` on an unknown thread returns an empty history, matching the
/// degraded-input tolerance the pipeline requires anyway.
#[derive(Default)]
pub struct StaticThreadConnector {
    threads: HashMap<String, ThreadHistory>,
}

impl StaticThreadConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a thread's history.
    pub fn with_thread(mut self, thread_id: &str, history: ThreadHistory) -> Self {
        self.threads.insert(thread_id.to_string(), history);
        self
    }
}

#[async_trait]
impl ThreadConnector for StaticThreadConnector {
    async fn fetch(
        &self,
        thread_id: &str,
        _tenant_id: &str,
    ) -> Result<ThreadHistory, ConnectorError> {
        Ok(self.threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn send(
        &self,
        thread_id: &str,
        to: &str,
        _subject: &str,
        _body: &str,
        _tenant_id: &str,
    ) -> Result<String, ConnectorError> {
        let message_id = Uuid::new_v4().to_string();
        debug!(thread_id, to, message_id = %message_id, "Static connector accepted outbound reply");
        Ok(message_id)
    }
}

// ── Calendar ────────────────────────────────────────────────────────

/// Deterministic slot finder driven entirely by tenant policy.
///
/// Walks forward from tomorrow, emitting one slot at the start of the
/// tenant's working hours on each configured working day.
#[derive(Default)]
pub struct WorkingHoursCalendar;

impl WorkingHoursCalendar {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CalendarConnector for WorkingHoursCalendar {
    async fn find_slots(
        &self,
        tenant_config: &TenantConfig,
        num_slots: usize,
        duration_minutes: u32,
        days_ahead: u32,
    ) -> Result<Vec<TimeSlot>, ConnectorError> {
        let today = Utc::now().date_naive();
        let mut slots = Vec::with_capacity(num_slots);

        for offset in 1..=days_ahead as u64 {
            if slots.len() >= num_slots {
                break;
            }
            let Some(date) = today.checked_add_days(Days::new(offset)) else {
                break;
            };
            let weekday = date.weekday().num_days_from_monday() as u8;
            if !tenant_config.working_days.contains(&weekday) {
                continue;
            }
            let Some(start) =
                date.and_hms_opt(u32::from(tenant_config.working_hours_start), 0, 0)
            else {
                return Err(ConnectorError::InvalidResponse {
                    connector: "calendar".into(),
                    reason: format!(
                        "working_hours_start {} is not a valid hour",
                        tenant_config.working_hours_start
                    ),
                });
            };
            slots.push(TimeSlot {
                start_time: start.and_utc(),
                duration_minutes,
                timezone: tenant_config.timezone.clone(),
            });
        }

        Ok(slots)
    }

    async fn create_event(
        &self,
        tenant_id: &str,
        title: &str,
        start_time: DateTime<Utc>,
        _duration_minutes: u32,
        _attendees: &[String],
    ) -> Result<String, ConnectorError> {
        let event_id = Uuid::new_v4().to_string();
        debug!(tenant_id, title, start = %start_time, event_id = %event_id, "Calendar event recorded");
        Ok(event_id)
    }

    async fn check_availability(
        &self,
        _tenant_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<bool, ConnectorError> {
        Ok(true)
    }
}

// ── Rule-based classifier ───────────────────────────────────────────

/// A single intent rule with a compiled regex.
struct IntentRule {
    regex: Regex,
    intent: Intent,
    sub_intent: Option<&'static str>,
    confidence: f64,
}

/// Keyword classifier: compiled patterns over subject + body, first
/// match wins. Stands in for the LLM classification service.
pub struct RuleClassifier {
    rules: Vec<IntentRule>,
    urgency: Regex,
}

impl RuleClassifier {
    /// Classifier with the default rule set.
    pub fn default_rules() -> Self {
        let rules = vec![
            IntentRule {
                regex: Regex::new(r"(?i)\bunsubscribe\b|\bwinner\b|act now|limited time offer")
                    .unwrap(),
                intent: Intent::Spam,
                sub_intent: None,
                confidence: 0.95,
            },
            IntentRule {
                regex: Regex::new(
                    r"(?i)\b(meeting|schedule|reschedul\w*|call|appointment|availab\w*|calendar)\b",
                )
                .unwrap(),
                intent: Intent::Scheduling,
                sub_intent: Some("meeting_request"),
                confidence: 0.9,
            },
            IntentRule {
                regex: Regex::new(r"(?i)\b(invoice|billing|payment|refund|charge[ds]?)\b").unwrap(),
                intent: Intent::Billing,
                sub_intent: None,
                confidence: 0.85,
            },
            IntentRule {
                regex: Regex::new(
                    r"(?i)\b(help|support|issue|problem|error|broken|not working|how (do|can) i)\b",
                )
                .unwrap(),
                intent: Intent::Support,
                sub_intent: Some("faq"),
                confidence: 0.88,
            },
            IntentRule {
                regex: Regex::new(r"(?i)\b(pricing|quote|demo|trial|interested in)\b").unwrap(),
                intent: Intent::Lead,
                sub_intent: None,
                confidence: 0.8,
            },
        ];

        Self {
            rules,
            urgency: Regex::new(r"(?i)\b(urgent|asap|immediately|critical|emergency)\b").unwrap(),
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    async fn classify(
        &self,
        message: &InboundMessage,
        _thread_history: &ThreadHistory,
        _tenant_config: &TenantConfig,
    ) -> Result<Classification, ConnectorError> {
        let haystack = format!("{}\n{}", message.subject, message.body_text);

        let (intent, sub_intent, confidence) = self
            .rules
            .iter()
            .find(|rule| rule.regex.is_match(&haystack))
            .map(|rule| (rule.intent, rule.sub_intent, rule.confidence))
            .unwrap_or((Intent::Other, None, 0.4));

        let priority = if self.urgency.is_match(&haystack) {
            Priority::Critical
        } else if intent == Intent::Spam {
            Priority::Low
        } else {
            Priority::Normal
        };

        debug!(
            intent = intent.label(),
            confidence,
            "Rule classifier matched inbound message"
        );

        Ok(Classification {
            intent,
            sub_intent: sub_intent.map(String::from),
            priority,
            confidence,
        })
    }
}

// ── Knowledge base ──────────────────────────────────────────────────

/// A seeded knowledge-base entry.
#[derive(Debug, Clone)]
pub struct KbEntry {
    pub title: String,
    pub content: String,
}

/// Token-overlap lookup over seeded entries.
pub struct StaticKnowledgeBase {
    entries: Vec<KbEntry>,
}

impl StaticKnowledgeBase {
    pub fn new(entries: Vec<KbEntry>) -> Self {
        Self { entries }
    }

    /// Starter article set for demo deployments.
    pub fn with_default_entries() -> Self {
        Self::new(vec![
            KbEntry {
                title: "Resetting your password".into(),
                content: "Use the forgot password link on the sign-in page to reset \
                          your password. Reset emails expire after 24 hours."
                    .into(),
            },
            KbEntry {
                title: "Exporting your data".into(),
                content: "Account owners can export all workspace data as CSV from \
                          Settings > Data export."
                    .into(),
            },
            KbEntry {
                title: "Inviting teammates".into(),
                content: "Invite teammates from Settings > Members. Invitations are \
                          valid for 7 days."
                    .into(),
            },
        ])
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KbMatch>, ConnectorError> {
        let query_tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(String::from)
            .collect();

        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches: Vec<KbMatch> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let haystack = format!("{} {}", entry.title, entry.content).to_lowercase();
                let hits = query_tokens.iter().filter(|t| haystack.contains(*t)).count();
                if hits == 0 {
                    return None;
                }
                Some(KbMatch {
                    title: entry.title.clone(),
                    excerpt: entry.content.chars().take(200).collect(),
                    score: hits as f64 / query_tokens.len() as f64,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}
