//! Append-only log of pending mutations.

use serde_json::Value;
use tracing::debug;

use crate::db::{Collection, Database, DbResult};
use crate::models::{SyncAction, SyncEntityType, SyncQueueEntry};

/// Sync queue over the `sync_queue` collection.
///
/// Entries come back in insertion order. There is no deduplication: three
/// updates to one patient are three entries.
pub struct SyncQueue<'a> {
    db: &'a Database,
}

impl<'a> SyncQueue<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All pending entries, oldest first.
    pub fn get_all(&self) -> DbResult<Vec<SyncQueueEntry>> {
        self.db.get_all()
    }

    /// Append an entry as-is.
    pub fn add(&self, entry: &SyncQueueEntry) -> DbResult<i64> {
        self.db.add(entry)
    }

    /// Stamp and append a mutation.
    pub fn record(
        &self,
        entity_type: SyncEntityType,
        action: SyncAction,
        payload: Value,
    ) -> DbResult<i64> {
        let entry = SyncQueueEntry::new(entity_type, action, payload);
        let id = self.add(&entry)?;
        debug!(
            queue_id = id,
            entity = entity_type.as_str(),
            action = action.as_str(),
            "queued mutation"
        );
        Ok(id)
    }

    pub fn delete(&self, id: i64) -> DbResult<bool> {
        self.db.delete::<SyncQueueEntry>(id)
    }

    /// Drop every pending entry.
    pub fn clear(&self) -> DbResult<usize> {
        self.db.clear(Collection::SyncQueue)
    }

    pub fn len(&self) -> DbResult<usize> {
        self.db.count(Collection::SyncQueue)
    }

    pub fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }
}
