//! Per-journey audit trail of every mutating operation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{Actor, JourneyStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Publish,
    Pause,
    Resume,
    Duplicate,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<JourneyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<JourneyStatus>,
    /// For duplicates, the journey that was copied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(journey_id: Uuid, actor: &Actor, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            journey_id,
            actor: actor.id().to_string(),
            action,
            from_status: None,
            to_status: None,
            source_id: None,
            details: serde_json::json!({}),
            at: Utc::now(),
        }
    }

    pub fn transition(mut self, from: JourneyStatus, to: JourneyStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    pub fn copied_from(mut self, source_id: Uuid) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Append-only, in-memory. Entries outlive the journey they describe; each
/// journey keeps at most `per_journey` of its newest entries.
#[derive(Debug)]
pub struct AuditLog {
    entries: DashMap<Uuid, Vec<AuditEntry>>,
    per_journey: usize,
}

impl AuditLog {
    pub fn new(per_journey: usize) -> Self {
        Self {
            entries: DashMap::new(),
            per_journey: per_journey.max(1),
        }
    }

    pub fn record(&self, entry: AuditEntry) {
        let mut trail = self.entries.entry(entry.journey_id).or_default();
        trail.push(entry);
        if trail.len() > self.per_journey {
            let excess = trail.len() - self.per_journey;
            trail.drain(..excess);
        }
    }

    /// Oldest first.
    pub fn for_journey(&self, journey_id: Uuid) -> Vec<AuditEntry> {
        self.entries
            .get(&journey_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}
