//! External collaborator contracts.
//!
//! The pipeline never talks to a vendor SDK directly — every external
//! dependency (thread transport, calendar, classification, knowledge
//! base) sits behind one of these traits. The defaults in [`stub`] are
//! deterministic in-process implementations; production deployments
//! swap in real connectors without touching the pipeline.

pub mod stub;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;
use crate::model::{Classification, InboundMessage, TenantConfig, ThreadHistory};

pub use stub::{RuleClassifier, StaticKnowledgeBase, StaticThreadConnector, WorkingHoursCalendar};

/// An available calendar slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub timezone: String,
}

/// A knowledge-base match for a support query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbMatch {
    pub title: String,
    pub excerpt: String,
    /// Relevance in [0, 1], higher is better.
    pub score: f64,
}

/// Email-like thread transport: fetch history, send replies.
#[async_trait]
pub trait ThreadConnector: Send + Sync {
    /// Fetch the full message history for a thread.
    async fn fetch(
        &self,
        thread_id: &str,
        tenant_id: &str,
    ) -> Result<ThreadHistory, ConnectorError>;

    /// Send a reply on a thread. Returns the message id of the sent
    /// message.
    async fn send(
        &self,
        thread_id: &str,
        to: &str,
        subject: &str,
        body: &str,
        tenant_id: &str,
    ) -> Result<String, ConnectorError>;
}

/// Calendar availability and event creation.
#[async_trait]
pub trait CalendarConnector: Send + Sync {
    /// Find available slots honoring the tenant's working hours/days.
    async fn find_slots(
        &self,
        tenant_config: &TenantConfig,
        num_slots: usize,
        duration_minutes: u32,
        days_ahead: u32,
    ) -> Result<Vec<TimeSlot>, ConnectorError>;

    /// Create an event. Returns the event id.
    async fn create_event(
        &self,
        tenant_id: &str,
        title: &str,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        attendees: &[String],
    ) -> Result<String, ConnectorError>;

    /// Check whether a time range is free.
    async fn check_availability(
        &self,
        tenant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, ConnectorError>;
}

/// Intent classification service (LLM or rule engine).
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &InboundMessage,
        thread_history: &ThreadHistory,
        tenant_config: &TenantConfig,
    ) -> Result<Classification, ConnectorError>;
}

/// Knowledge-base lookup for support answers.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Search for relevant entries, best matches first.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KbMatch>, ConnectorError>;
}
