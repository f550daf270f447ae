//! Pending-mutation records for the sync queue.

use serde::{Deserialize, Serialize};

use super::now_rfc3339;

/// Entity kinds whose mutations are queued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SyncEntityType {
    Patient,
    Appointment,
    HealthRecord,
    User,
}

impl SyncEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEntityType::Patient => "patient",
            SyncEntityType::Appointment => "appointment",
            SyncEntityType::HealthRecord => "healthRecord",
            SyncEntityType::User => "user",
        }
    }
}

/// Mutation kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Add,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Add => "add",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

/// One queued mutation awaiting transmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub entity_type: SyncEntityType,
    pub action: SyncAction,
    /// Snapshot of the record as written (for deletes, just its key)
    pub payload: serde_json::Value,
    /// When the mutation happened (RFC 3339)
    pub timestamp: String,
}

impl SyncQueueEntry {
    /// Create an entry stamped with the current time.
    pub fn new(entity_type: SyncEntityType, action: SyncAction, payload: serde_json::Value) -> Self {
        Self {
            id: None,
            entity_type,
            action,
            payload,
            timestamp: now_rfc3339(),
        }
    }

    /// Key of the mutated entity, if the payload carries one.
    pub fn entity_id(&self) -> Option<i64> {
        self.payload.get("id").and_then(|v| v.as_i64())
    }
}
